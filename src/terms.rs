use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use super::numerics::Numeric;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// True for the bare wildcard token and for the fresh names the parser
    /// mints for it (`_1`, `_2`, …). Wildcards in a clause head's argument
    /// positions match anything without binding.
    pub fn is_wildcard(&self) -> bool {
        self.0 == "_"
            || (self.0.len() > 1
                && self.0.starts_with('_')
                && self.0[1..].chars().all(|c| c.is_ascii_digit()))
    }
}

pub type TermList = Vec<Term>;

/// A predicate application: clause heads and body subgoals.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Call {
    pub name: Symbol,
    pub args: TermList,
}

impl Call {
    pub fn new(name: &str, args: TermList) -> Self {
        Self {
            name: Symbol::new(name),
            args,
        }
    }
}

/// The `[Head|Tail]` pattern. Multi-element heads collapse right-to-left at
/// parse time, so `[a,b|T]` is `[a|[b|T]]`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Cons {
    pub head: Term,
    pub tail: Term,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Operator {
    Is,
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Geq,
    Leq,
}

/// A bare arithmetic or comparison goal such as `X is Y+1` or `X > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Operation {
    pub operator: Operator,
    pub args: TermList,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Value {
    Number(Numeric),
    String(String),
    Variable(Symbol),
    List(TermList),
    Cons(Cons),
    Call(Call),
    Expression(Operation),
}

impl Value {
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Value::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TermList> {
        match self {
            Value::List(elements) => Some(elements),
            _ => None,
        }
    }

    /// A value is ground when no variable occurs anywhere inside it.
    pub fn is_ground(&self) -> bool {
        match self {
            Value::Variable(_) => false,
            Value::Number(_) | Value::String(_) => true,
            Value::List(elements) => elements.iter().all(|t| t.is_ground()),
            Value::Cons(cons) => cons.head.is_ground() && cons.tail.is_ground(),
            Value::Call(call) => call.args.iter().all(|t| t.is_ground()),
            Value::Expression(op) => op.args.iter().all(|t| t.is_ground()),
        }
    }

    /// Collect every variable occurring in this value.
    pub fn variables(&self, vars: &mut HashSet<Symbol>) {
        match self {
            Value::Variable(name) => {
                vars.insert(name.clone());
            }
            Value::Number(_) | Value::String(_) => {}
            Value::List(elements) => elements.iter().for_each(|t| t.value().variables(vars)),
            Value::Cons(cons) => {
                cons.head.value().variables(vars);
                cons.tail.value().variables(vars);
            }
            Value::Call(call) => call.args.iter().for_each(|t| t.value().variables(vars)),
            Value::Expression(op) => op.args.iter().for_each(|t| t.value().variables(vars)),
        }
    }
}

/// A logic term. The underlying value is reference-counted so that goals
/// and clause instances can share structure freely.
#[derive(Debug, Clone, Serialize, Deserialize, Eq)]
pub struct Term {
    value: Arc<Value>,
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Hash for Term {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.value().hash(state)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl Term {
    pub fn new(value: Value) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// Get a reference to the underlying data of this term.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_ground(&self) -> bool {
        self.value().is_ground()
    }

    /// Get a set of all the variables used within a term.
    pub fn variables(&self, vars: &mut HashSet<Symbol>) {
        self.value().variables(vars)
    }

    /// Does the given variable occur in this term?
    pub fn contains_variable(&self, var: &Symbol) -> bool {
        match self.value() {
            Value::Variable(name) => name == var,
            Value::Number(_) | Value::String(_) => false,
            Value::List(elements) => elements.iter().any(|t| t.contains_variable(var)),
            Value::Cons(cons) => {
                cons.head.contains_variable(var) || cons.tail.contains_variable(var)
            }
            Value::Call(call) => call.args.iter().any(|t| t.contains_variable(var)),
            Value::Expression(op) => op.args.iter().any(|t| t.contains_variable(var)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_names() {
        assert!(Symbol::new("_").is_wildcard());
        assert!(Symbol::new("_17").is_wildcard());
        assert!(!Symbol::new("X").is_wildcard());
        // Tokens like `_foo` are atoms, not freshened wildcards.
        assert!(!Symbol::new("_foo").is_wildcard());
    }

    #[test]
    fn test_groundness_and_variables() {
        let term = term!(value!([
            value!("a"),
            value!(sym!("X")),
            value!([value!(sym!("Y")), value!(1)])
        ]));
        assert!(!term.is_ground());
        assert!(term.contains_variable(&sym!("X")));
        assert!(term.contains_variable(&sym!("Y")));
        assert!(!term.contains_variable(&sym!("Z")));

        let mut vars = HashSet::new();
        term.variables(&mut vars);
        assert_eq!(vars, hashset! {sym!("X"), sym!("Y")});

        assert!(term!(value!([value!("a"), value!(2)])).is_ground());
    }

    #[test]
    fn test_number_identity() {
        // `2` and `2.0` unify as constants, so they must compare equal.
        assert_eq!(
            term!(value!(2)),
            term!(Value::Number(Numeric::Float(2.0)))
        );
    }
}
