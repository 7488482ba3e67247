//! Turns clause and query text into terms.
//!
//! The surface syntax is deliberately small: `pred(arg,…)` applications,
//! `head :- goal, goal` rules, `[a,b]` lists, `[H|T]` patterns, and bare
//! arithmetic/comparison goals such as `N is M+1` or `N >= 18`. Whitespace is
//! insignificant and a trailing `.` is allowed. Splitting on `,` happens only
//! at bracket depth zero; commas inside `[…]` or `(…)` belong to a sub-term.

use super::counter::Counter;
use super::error::{HornResult, ParseError};
use super::rules::Clause;
use super::terms::{Call, Cons, Numeric, Operation, Operator, Symbol, Term, Value};

/// Parse one clause: a fact `pred(args…)` or a rule `head :- goal, goal`.
/// `counter` supplies fresh names for wildcard occurrences.
pub fn parse_clause(counter: &Counter, src: &str) -> HornResult<Clause> {
    let text = scrub(src);
    if text.is_empty() {
        return Err(ParseError::EmptyTerm {
            token: src.to_string(),
        }
        .into());
    }
    match find_neck(&text)? {
        Some(idx) => {
            let head = parse_call(counter, &text[..idx])?;
            let body = split_top_level(&text[idx + 2..], &[',', ';'])?
                .iter()
                .map(|goal| parse_goal(counter, goal))
                .collect::<HornResult<Vec<Term>>>()?;
            Ok(Clause::new(head, body))
        }
        None => Ok(Clause::fact(parse_call(counter, &text)?)),
    }
}

/// Parse a query goal. Queries must be predicate applications; a bare
/// expression has nothing to prove against the clause store.
pub fn parse_query(counter: &Counter, src: &str) -> HornResult<Call> {
    let text = scrub(src);
    if text.is_empty() {
        return Err(ParseError::EmptyTerm {
            token: src.to_string(),
        }
        .into());
    }
    parse_call(counter, &text)
}

/// Parse a single argument term: wildcard, variable, number, list, cons
/// pattern, nested application, or atom.
pub fn parse_term(counter: &Counter, text: &str) -> HornResult<Term> {
    if text.is_empty() {
        return Err(ParseError::EmptyTerm {
            token: text.to_string(),
        }
        .into());
    }
    if text == "_" {
        // Every wildcard occurrence becomes its own fresh variable.
        return Ok(Term::from(Value::Variable(Symbol(format!(
            "_{}",
            counter.next()
        )))));
    }
    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(|| ParseError::UnbalancedBrackets {
            token: text.to_string(),
        })?;
        return parse_list(counter, inner, text);
    }
    if text.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Ok(Term::from(Value::Variable(Symbol::new(text))));
    }
    if let Some(n) = Numeric::parse(text) {
        return Ok(Term::from(Value::Number(n)));
    }
    if let Some(open) = find_top_level(text, &['('])? {
        let call = parse_application(counter, text, open)?;
        return Ok(Term::from(Value::Call(call)));
    }
    Ok(Term::from(Value::String(text.to_string())))
}

/// Drop all whitespace and any trailing periods.
fn scrub(src: &str) -> String {
    let stripped: String = src.chars().filter(|c| !c.is_whitespace()).collect();
    stripped.trim_end_matches('.').to_string()
}

/// Locate the `:-` neck at bracket depth zero.
fn find_neck(text: &str) -> HornResult<Option<usize>> {
    let mut stack: Vec<char> = vec![];
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        match c {
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            ')' | ']' => {
                if stack.pop() != Some(c) {
                    return Err(ParseError::UnbalancedBrackets {
                        token: text.to_string(),
                    }
                    .into());
                }
            }
            ':' if stack.is_empty() && matches!(iter.peek(), Some((_, '-'))) => {
                return Ok(Some(i));
            }
            _ => {}
        }
    }
    Ok(None)
}

/// Split `text` on any of `separators` occurring at bracket depth zero.
/// Mismatched or unclosed brackets are an error, never a partial parse.
fn split_top_level(text: &str, separators: &[char]) -> HornResult<Vec<String>> {
    let mut parts = vec![];
    let mut current = String::new();
    let mut stack: Vec<char> = vec![];
    for c in text.chars() {
        match c {
            '(' => {
                stack.push(')');
                current.push(c);
            }
            '[' => {
                stack.push(']');
                current.push(c);
            }
            ')' | ']' => {
                if stack.pop() != Some(c) {
                    return Err(ParseError::UnbalancedBrackets {
                        token: text.to_string(),
                    }
                    .into());
                }
                current.push(c);
            }
            c if stack.is_empty() && separators.contains(&c) => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !stack.is_empty() {
        return Err(ParseError::UnbalancedBrackets {
            token: text.to_string(),
        }
        .into());
    }
    parts.push(current);
    Ok(parts)
}

/// First occurrence of any of `needles` at bracket depth zero.
fn find_top_level(text: &str, needles: &[char]) -> HornResult<Option<usize>> {
    let mut stack: Vec<char> = vec![];
    for (i, c) in text.char_indices() {
        match c {
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            ')' | ']' => {
                if stack.pop() != Some(c) {
                    return Err(ParseError::UnbalancedBrackets {
                        token: text.to_string(),
                    }
                    .into());
                }
            }
            c if stack.is_empty() && needles.contains(&c) => return Ok(Some(i)),
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(ParseError::UnbalancedBrackets {
            token: text.to_string(),
        }
        .into());
    }
    Ok(None)
}

/// Parse a body goal: a predicate application or a bare expression.
fn parse_goal(counter: &Counter, text: &str) -> HornResult<Term> {
    if text.is_empty() {
        return Err(ParseError::EmptyTerm {
            token: text.to_string(),
        }
        .into());
    }
    if let Some(open) = find_top_level(text, &['('])? {
        if open == 0 {
            // A fully parenthesized bare expression, `(X>0)`.
            return parse_expression(counter, text);
        }
        let call = parse_application(counter, text, open)?;
        return Ok(Term::from(Value::Call(call)));
    }
    if text.contains('>') || text.contains('<') || split_assignment(text).is_some() {
        return parse_expression(counter, text);
    }
    // A bare name is a zero-argument predicate.
    Ok(Term::from(Value::Call(Call {
        name: Symbol::new(text),
        args: vec![],
    })))
}

/// Parse the goal as a clause head or query: it must be an application.
fn parse_call(counter: &Counter, text: &str) -> HornResult<Call> {
    match parse_goal(counter, text)?.value() {
        Value::Call(call) => Ok(call.clone()),
        _ => Err(ParseError::MissingPredicate {
            token: text.to_string(),
        }
        .into()),
    }
}

/// Parse `name(arg,…)` where `open` is the offset of the `(`.
fn parse_application(counter: &Counter, text: &str, open: usize) -> HornResult<Call> {
    if open == 0 {
        return Err(ParseError::MissingPredicate {
            token: text.to_string(),
        }
        .into());
    }
    if !text.ends_with(')') {
        return Err(ParseError::UnbalancedBrackets {
            token: text.to_string(),
        }
        .into());
    }
    let name = &text[..open];
    let inner = &text[open + 1..text.len() - 1];
    let args = if inner.is_empty() {
        vec![]
    } else {
        split_top_level(inner, &[','])?
            .iter()
            .map(|arg| parse_term(counter, arg))
            .collect::<HornResult<Vec<Term>>>()?
    };
    Ok(Call {
        name: Symbol::new(name),
        args,
    })
}

/// Parse the inside of a list literal. `outer` is the original token, kept
/// for error messages.
fn parse_list(counter: &Counter, inner: &str, outer: &str) -> HornResult<Term> {
    if inner.is_empty() {
        return Ok(Term::from(Value::List(vec![])));
    }
    if let Some(bar) = find_top_level(inner, &['|'])? {
        // `[a,b|T]` collapses right-to-left into `[a|[b|T]]`.
        let heads = split_top_level(&inner[..bar], &[','])?;
        if heads.iter().any(|h| h.is_empty()) {
            return Err(ParseError::EmptyTerm {
                token: outer.to_string(),
            }
            .into());
        }
        let mut term = parse_term(counter, &inner[bar + 1..])?;
        for head in heads.iter().rev() {
            term = Term::from(Value::Cons(Cons {
                head: parse_term(counter, head)?,
                tail: term,
            }));
        }
        return Ok(term);
    }
    let elements = split_top_level(inner, &[','])?
        .iter()
        .map(|e| parse_term(counter, e))
        .collect::<HornResult<Vec<Term>>>()?;
    Ok(Term::from(Value::List(elements)))
}

/// Split `Lhs is Rhs` on the first `is`, provided the left side is a
/// variable token. With whitespace already stripped this is the only
/// delimiter the assignment form has.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let i = text.find("is")?;
    let lhs = &text[..i];
    let rhs = &text[i + 2..];
    let valid = lhs.starts_with(|c: char| c.is_ascii_uppercase())
        && lhs.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid && !rhs.is_empty() {
        Some((lhs, rhs))
    } else {
        None
    }
}

/// Parse a bare expression goal: a comparison or an `is` assignment.
/// Parentheses are not part of the expression grammar and are dropped.
fn parse_expression(counter: &Counter, text: &str) -> HornResult<Term> {
    let text: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
    for (token, operator) in [
        (">=", Operator::Geq),
        ("<=", Operator::Leq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ] {
        if let Some(i) = find_substring_top_level(&text, token)? {
            let left = parse_arith(counter, &text[..i])?;
            let right = parse_arith(counter, &text[i + token.len()..])?;
            return Ok(Term::from(Value::Expression(Operation {
                operator,
                args: vec![left, right],
            })));
        }
    }
    if let Some((lhs, rhs)) = split_assignment(&text) {
        let left = parse_term(counter, lhs)?;
        let right = parse_arith(counter, rhs)?;
        return Ok(Term::from(Value::Expression(Operation {
            operator: Operator::Is,
            args: vec![left, right],
        })));
    }
    Err(ParseError::InvalidExpression { token: text }.into())
}

fn find_substring_top_level(text: &str, needle: &str) -> HornResult<Option<usize>> {
    let mut stack: Vec<char> = vec![];
    for (i, c) in text.char_indices() {
        match c {
            '[' => stack.push(']'),
            ']' => {
                if stack.pop() != Some(c) {
                    return Err(ParseError::UnbalancedBrackets {
                        token: text.to_string(),
                    }
                    .into());
                }
            }
            _ if stack.is_empty() && text[i..].starts_with(needle) => return Ok(Some(i)),
            _ => {}
        }
    }
    Ok(None)
}

/// Parse an arithmetic chain with ordinary precedence: `+ -` bind looser
/// than `* /`, both left-associative. A leading `-` (or one right after
/// another operator) is a sign, not a split point.
fn parse_arith(counter: &Counter, text: &str) -> HornResult<Term> {
    if text.is_empty() {
        return Err(ParseError::InvalidExpression {
            token: text.to_string(),
        }
        .into());
    }
    for ops in [&['+', '-'][..], &['*', '/'][..]] {
        if let Some((i, c)) = find_last_operator(text, ops)? {
            let operator = match c {
                '+' => Operator::Add,
                '-' => Operator::Sub,
                '*' => Operator::Mul,
                _ => Operator::Div,
            };
            let left = parse_arith(counter, &text[..i])?;
            let right = parse_arith(counter, &text[i + 1..])?;
            return Ok(Term::from(Value::Expression(Operation {
                operator,
                args: vec![left, right],
            })));
        }
    }
    parse_term(counter, text)
}

/// Rightmost top-level occurrence of any of `ops` usable as a binary split:
/// not at the start, and not directly after another operator.
fn find_last_operator(text: &str, ops: &[char]) -> HornResult<Option<(usize, char)>> {
    let mut stack: Vec<char> = vec![];
    let mut found = None;
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        match c {
            '[' => stack.push(']'),
            ']' => {
                if stack.pop() != Some(c) {
                    return Err(ParseError::UnbalancedBrackets {
                        token: text.to_string(),
                    }
                    .into());
                }
            }
            c if stack.is_empty() && ops.contains(&c) => {
                let signed = i == 0 || matches!(prev, Some('+' | '-' | '*' | '/'));
                if !signed {
                    found = Some((i, c));
                }
            }
            _ => {}
        }
        prev = Some(c);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Term {
        parse_term(&Counter::default(), src).unwrap()
    }

    #[test]
    fn test_parse_terms() {
        assert_eq!(parse("tom"), term!("tom"));
        assert_eq!(parse("X"), term!(value!(sym!("X"))));
        assert_eq!(parse("42"), term!(value!(42)));
        assert_eq!(parse("-1.5"), term!(value!(-1.5)));
        assert_eq!(parse("[]"), term!(value!([])));
        assert_eq!(
            parse("[a,b]"),
            term!(value!([value!("a"), value!("b")]))
        );
    }

    #[test]
    fn test_cons_patterns_collapse_right_to_left() {
        // `[a,b|T]` is exactly `[a|[b|T]]`.
        assert_eq!(parse("[a,b|T]"), parse("[a|[b|T]]"));
        assert_eq!(parse("[H|T]").to_string(), "[H|T]");
        assert_eq!(parse("[a,b|T]").to_string(), "[a|[b|T]]");
    }

    #[test]
    fn test_wildcards_never_alias() {
        let counter = Counter::with_start(1);
        let term = parse_term(&counter, "[_,_]").unwrap();
        assert_eq!(term.to_string(), "[_1,_2]");
    }

    #[test]
    fn test_splits_only_on_top_level_commas() {
        let counter = Counter::default();
        let clause = parse_clause(&counter, "p(f(a,b),[1,2],c).").unwrap();
        assert_eq!(clause.head.args.len(), 3);
        assert_eq!(clause.head.args[0].to_string(), "f(a,b)");
        assert_eq!(clause.head.args[1].to_string(), "[1,2]");
    }

    #[test]
    fn test_rule_bodies() {
        let counter = Counter::default();
        let clause =
            parse_clause(&counter, "grandparent(X,Z) :- parent(X,Y), parent(Y,Z).").unwrap();
        assert_eq!(clause.head.name, sym!("grandparent"));
        assert_eq!(clause.body.len(), 2);
        assert_eq!(clause.body[0].to_string(), "parent(X,Y)");
        assert!(!clause.is_fact());
    }

    #[test]
    fn test_expression_goals() {
        let counter = Counter::default();
        let clause = parse_clause(&counter, "next(X,Y) :- Y is X+1.").unwrap();
        match clause.body[0].value() {
            Value::Expression(op) => {
                assert_eq!(op.operator, Operator::Is);
                assert_eq!(op.args[1].to_string(), "X+1");
            }
            other => panic!("expected expression, got {:?}", other),
        }

        let clause = parse_clause(&counter, "adult(X) :- age(X,N), N >= 18.").unwrap();
        match clause.body[1].value() {
            Value::Expression(op) => assert_eq!(op.operator, Operator::Geq),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_arith_precedence() {
        let counter = Counter::default();
        let clause = parse_clause(&counter, "f(X,Y) :- Y is X*2+1.").unwrap();
        // `X*2+1` parses as `(X*2)+1`.
        match clause.body[0].value() {
            Value::Expression(op) => {
                assert_eq!(op.operator, Operator::Is);
                match op.args[1].value() {
                    Value::Expression(rhs) => {
                        assert_eq!(rhs.operator, Operator::Add);
                        assert_eq!(rhs.args[0].to_string(), "X*2");
                    }
                    other => panic!("expected nested expression, got {:?}", other),
                }
            }
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_brackets_error() {
        let counter = Counter::default();
        assert!(parse_clause(&counter, "p(a").is_err());
        assert!(parse_clause(&counter, "p(a]b)").is_err());
        assert!(parse_clause(&counter, "p([a,b)").is_err());
        assert!(parse_term(&counter, "[a,b").is_err());
        assert!(parse_term(&counter, "").is_err());
    }

    #[test]
    fn test_queries_must_be_applications() {
        let counter = Counter::default();
        assert!(parse_query(&counter, "parent(tom,X)").is_ok());
        assert!(parse_query(&counter, "(X>0)").is_err());
        assert!(parse_query(&counter, "").is_err());
    }
}
