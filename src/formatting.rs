//! `Display` implementations for terms, clauses and answers.
//!
//! The rendered forms use the same surface syntax the parser accepts (no
//! whitespace, `[a,b,c]` lists, `[h|t]` patterns, `head:-goal,goal` clauses),
//! so displaying a term and re-parsing it yields the same structure. The
//! clause store also sorts its buckets by these strings.

use std::fmt;

use super::numerics::Numeric;
use super::rules::Clause;
use super::terms::{Call, Cons, Operation, Operator, Symbol, Term, Value};
use super::vm::Answer;

/// Format a list of terms separated by `sep`.
pub fn format_args(args: &[Term], sep: &str) -> String {
    args.iter()
        .map(|t| t.to_string())
        .collect::<Vec<String>>()
        .join(sep)
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Numeric::Integer(i) => write!(f, "{}", i),
            Numeric::Float(n) => write!(f, "{}", n),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Variable(name) => write!(f, "{}", name),
            Value::List(elements) => write!(f, "[{}]", format_args(elements, ",")),
            Value::Cons(cons) => write!(f, "{}", cons),
            Value::Call(call) => write!(f, "{}", call),
            Value::Expression(op) => write!(f, "{}", op),
        }
    }
}

impl fmt::Display for Cons {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}|{}]", self.head, self.tail)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}({})", self.name, format_args(&self.args, ","))
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.args.first(), self.args.get(1)) {
            (Some(left), Some(right)) if self.operator == Operator::Is => {
                write!(f, "{} is {}", left, right)
            }
            (Some(left), Some(right)) => write!(f, "{}{}{}", left, self.operator, right),
            _ => write!(f, "{}", format_args(&self.args, &self.operator.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let token = match self {
            Operator::Is => "is",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Geq => ">=",
            Operator::Leq => "<=",
        };
        write!(f, "{}", token)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}", self.head)
        } else {
            write!(f, "{}:-{}", self.head, format_args(&self.body, ","))
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Answer::Yes => write!(f, "Yes"),
            Answer::No => write!(f, "No"),
            Answer::Bindings(bindings) => {
                let pairs = bindings
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, value))
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "{{{}}}", pairs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_round_trip_forms() {
        assert_eq!(term!(value!([value!("a"), value!(1)])).to_string(), "[a,1]");
        assert_eq!(
            Term::from(Value::Cons(Cons {
                head: term!("a"),
                tail: term!(value!(sym!("T"))),
            }))
            .to_string(),
            "[a|T]"
        );
        assert_eq!(
            call!("parent", ["tom", value!(sym!("X"))]).to_string(),
            "parent(tom,X)"
        );
        assert_eq!(call!("halt").to_string(), "halt");
    }

    #[test]
    fn test_expression_display() {
        let op = op!(Is, value!(sym!("X")), Value::Expression(op!(Add, value!(sym!("Y")), value!(1))));
        assert_eq!(op.to_string(), "X is Y+1");
        assert_eq!(op!(Geq, value!(sym!("N")), value!(18)).to_string(), "N>=18");
    }

    #[test]
    fn test_clause_display() {
        let fact = clause!("parent", ["tom", "bob"]);
        assert_eq!(fact.to_string(), "parent(tom,bob)");

        let rule = clause!(
            "grandparent",
            [value!(sym!("X")), value!(sym!("Z"))] =>
            call!("parent", [value!(sym!("X")), value!(sym!("Y"))]),
            call!("parent", [value!(sym!("Y")), value!(sym!("Z"))])
        );
        assert_eq!(
            rule.to_string(),
            "grandparent(X,Z):-parent(X,Y),parent(Y,Z)"
        );
    }
}
