use std::collections::BTreeMap;

use super::terms::{Call, Cons, Symbol, Term, Value};

/// A map of bindings: variable name → value, scoped to one proof branch.
/// Ordered so that answers render deterministically.
pub type Bindings = BTreeMap<Symbol, Term>;

/// Substitution follows variable-to-variable chains; anything deeper than
/// this is assumed to be cyclic and is left unresolved.
const MAX_SUBSTITUTE_DEPTH: usize = 100;

/// Replace every bound variable in `term` with its value under `bindings`,
/// recursively. A cons pattern whose tail resolves to a concrete list is
/// flattened, so `[H|T]` with `H=a, T=[b,c]` comes out as `[a,b,c]`.
pub fn substitute(term: &Term, bindings: &Bindings) -> Term {
    substitute_inner(term, bindings, 0)
}

/// Substitute into every argument of a predicate application.
pub fn substitute_call(call: &Call, bindings: &Bindings) -> Call {
    Call {
        name: call.name.clone(),
        args: call.args.iter().map(|t| substitute(t, bindings)).collect(),
    }
}

fn substitute_inner(term: &Term, bindings: &Bindings, depth: usize) -> Term {
    if depth > MAX_SUBSTITUTE_DEPTH {
        return term.clone();
    }
    match term.value() {
        Value::Variable(name) => match bindings.get(name) {
            Some(value) if value != term => substitute_inner(value, bindings, depth + 1),
            _ => term.clone(),
        },
        Value::List(elements) => Term::from(Value::List(
            elements
                .iter()
                .map(|t| substitute_inner(t, bindings, depth + 1))
                .collect(),
        )),
        Value::Cons(cons) => {
            let head = substitute_inner(&cons.head, bindings, depth + 1);
            let tail = substitute_inner(&cons.tail, bindings, depth + 1);
            match tail.value() {
                Value::List(rest) => {
                    let mut elements = vec![head];
                    elements.extend(rest.iter().cloned());
                    Term::from(Value::List(elements))
                }
                _ => Term::from(Value::Cons(Cons { head, tail })),
            }
        }
        Value::Call(call) => Term::from(Value::Call(Call {
            name: call.name.clone(),
            args: call
                .args
                .iter()
                .map(|t| substitute_inner(t, bindings, depth + 1))
                .collect(),
        })),
        Value::Expression(op) => {
            let mut op = op.clone();
            op.args = op
                .args
                .iter()
                .map(|t| substitute_inner(t, bindings, depth + 1))
                .collect();
            Term::from(Value::Expression(op))
        }
        _ => term.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_chains() {
        let bindings: Bindings = btreemap! {
            sym!("X") => term!(value!(sym!("Y"))),
            sym!("Y") => term!("a"),
        };
        assert_eq!(substitute(&term!(value!(sym!("X"))), &bindings), term!("a"));
        // An unbound variable passes through untouched.
        assert_eq!(
            substitute(&term!(value!(sym!("Z"))), &bindings),
            term!(value!(sym!("Z")))
        );
    }

    #[test]
    fn test_substitute_flattens_cons() {
        let bindings: Bindings = btreemap! {
            sym!("H") => term!("a"),
            sym!("T") => term!(value!([value!("b"), value!("c")])),
        };
        let pattern = Term::from(Value::Cons(Cons {
            head: term!(value!(sym!("H"))),
            tail: term!(value!(sym!("T"))),
        }));
        assert_eq!(
            substitute(&pattern, &bindings),
            term!(value!([value!("a"), value!("b"), value!("c")]))
        );
    }

    #[test]
    fn test_substitute_keeps_open_tail() {
        let bindings: Bindings = btreemap! { sym!("H") => term!("a") };
        let pattern = Term::from(Value::Cons(Cons {
            head: term!(value!(sym!("H"))),
            tail: term!(value!(sym!("T"))),
        }));
        assert_eq!(substitute(&pattern, &bindings).to_string(), "[a|T]");
    }

    #[test]
    fn test_substitute_survives_variable_cycles() {
        // The unifier's occurs-check prevents these from arising in search,
        // but substitution must still terminate on a hand-built cycle.
        let bindings: Bindings = btreemap! {
            sym!("X") => term!(value!(sym!("Y"))),
            sym!("Y") => term!(value!(sym!("X"))),
        };
        let resolved = substitute(&term!(value!(sym!("X"))), &bindings);
        assert!(matches!(resolved.value(), Value::Variable(_)));
    }
}
