//! Structural unification.
//!
//! The two sides of a unification come from different clauses, so variables
//! with the same textual name must never collide: all internal bookkeeping
//! keys on `(Side, name)`. Callers hand in one environment per side; on
//! success every variable that resolved to a ground value is written back
//! into its owning side's environment. On failure the environments are
//! unspecified and the caller must discard the branch.

use std::collections::{HashMap, HashSet};

use super::bindings::Bindings;
use super::terms::{Call, Symbol, Term, Value};

/// Cap on term-recursion depth. Deeper structures fail to unify instead of
/// overflowing the stack.
pub const MAX_UNIFY_DEPTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    Head,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VarId {
    side: Side,
    name: Symbol,
}

/// A term tagged with the side it came from. Sub-terms inherit the tag.
#[derive(Debug, Clone)]
struct Tagged {
    side: Side,
    term: Term,
}

impl Tagged {
    fn sub(&self, term: &Term) -> Self {
        Self {
            side: self.side,
            term: term.clone(),
        }
    }
}

#[derive(Default)]
struct Substitution {
    map: HashMap<VarId, Tagged>,
}

impl Substitution {
    fn seed(head_env: &Bindings, query_env: &Bindings) -> Self {
        let mut subs = Self::default();
        for (name, value) in head_env {
            subs.map.insert(
                VarId {
                    side: Side::Head,
                    name: name.clone(),
                },
                Tagged {
                    side: Side::Head,
                    term: value.clone(),
                },
            );
        }
        for (name, value) in query_env {
            subs.map.insert(
                VarId {
                    side: Side::Query,
                    name: name.clone(),
                },
                Tagged {
                    side: Side::Query,
                    term: value.clone(),
                },
            );
        }
        subs
    }

    /// Follow variable bindings to a final value. The visited set stops a
    /// variable from ever resolving through itself.
    fn deref(&self, node: &Tagged) -> Tagged {
        let mut visited: HashSet<VarId> = HashSet::new();
        let mut current = node.clone();
        loop {
            let id = match current.term.value() {
                Value::Variable(name) => VarId {
                    side: current.side,
                    name: name.clone(),
                },
                _ => return current,
            };
            if !visited.insert(id.clone()) {
                return current;
            }
            match self.map.get(&id) {
                Some(next) => current = next.clone(),
                None => return current,
            }
        }
    }

    /// Does `id` occur anywhere inside `node`? Binding a variable into a
    /// structure that contains it would build a cyclic term.
    fn occurs(&self, id: &VarId, node: &Tagged) -> bool {
        let node = self.deref(node);
        match node.term.value() {
            Value::Variable(name) => {
                id.side == node.side && id.name == *name
            }
            Value::List(elements) => elements.iter().any(|e| self.occurs(id, &node.sub(e))),
            Value::Cons(cons) => {
                self.occurs(id, &node.sub(&cons.head)) || self.occurs(id, &node.sub(&cons.tail))
            }
            Value::Call(call) => call.args.iter().any(|a| self.occurs(id, &node.sub(a))),
            _ => false,
        }
    }

    fn bind(&mut self, id: VarId, value: Tagged) -> bool {
        if self.occurs(&id, &value) {
            return false;
        }
        self.map.insert(id, value);
        true
    }

    /// Resolve `node` as deeply as the substitution allows, flattening cons
    /// patterns whose tails became concrete lists.
    fn resolve(&self, node: &Tagged) -> Term {
        let node = self.deref(node);
        match node.term.value() {
            Value::List(elements) => Term::from(Value::List(
                elements.iter().map(|e| self.resolve(&node.sub(e))).collect(),
            )),
            Value::Cons(cons) => {
                let head = self.resolve(&node.sub(&cons.head));
                let tail = self.resolve(&node.sub(&cons.tail));
                match tail.value() {
                    Value::List(rest) => {
                        let mut elements = vec![head];
                        elements.extend(rest.iter().cloned());
                        Term::from(Value::List(elements))
                    }
                    _ => Term::from(Value::Cons(super::terms::Cons { head, tail })),
                }
            }
            Value::Call(call) => Term::from(Value::Call(Call {
                name: call.name.clone(),
                args: call.args.iter().map(|a| self.resolve(&node.sub(a))).collect(),
            })),
            _ => node.term.clone(),
        }
    }

    /// Write ground resolutions back into the caller-owned environments.
    fn propagate(&self, head_env: &mut Bindings, query_env: &mut Bindings) {
        for (id, value) in &self.map {
            let resolved = self.resolve(value);
            if resolved.is_ground() {
                match id.side {
                    Side::Head => head_env.insert(id.name.clone(), resolved),
                    Side::Query => query_env.insert(id.name.clone(), resolved),
                };
            }
        }
    }
}

/// Unify a clause head against a query goal, under each side's environment.
/// Environments are updated in place on success. Any mismatch in predicate
/// name or arity fails immediately; a wildcard in a head argument position
/// matches without binding.
pub fn unify(
    head: &Call,
    query: &Call,
    head_env: &mut Bindings,
    query_env: &mut Bindings,
) -> bool {
    if head.name != query.name || head.args.len() != query.args.len() {
        return false;
    }
    let mut subs = Substitution::seed(head_env, query_env);
    for (head_arg, query_arg) in head.args.iter().zip(query.args.iter()) {
        if let Value::Variable(name) = head_arg.value() {
            if name.is_wildcard() {
                continue;
            }
        }
        let a = Tagged {
            side: Side::Head,
            term: head_arg.clone(),
        };
        let b = Tagged {
            side: Side::Query,
            term: query_arg.clone(),
        };
        if !unify_nodes(&mut subs, &a, &b, 0) {
            return false;
        }
    }
    subs.propagate(head_env, query_env);
    true
}

fn unify_nodes(subs: &mut Substitution, a: &Tagged, b: &Tagged, depth: usize) -> bool {
    if depth > MAX_UNIFY_DEPTH {
        return false;
    }
    let a = subs.deref(a);
    let b = subs.deref(b);
    match (a.term.value(), b.term.value()) {
        // The same unbound variable unifies with itself.
        (Value::Variable(x), Value::Variable(y)) if a.side == b.side && x == y => true,
        (Value::Variable(x), _) => subs.bind(
            VarId {
                side: a.side,
                name: x.clone(),
            },
            b.clone(),
        ),
        (_, Value::Variable(y)) => subs.bind(
            VarId {
                side: b.side,
                name: y.clone(),
            },
            a.clone(),
        ),
        (Value::Number(m), Value::Number(n)) => m == n,
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Cons(pattern), Value::List(elements)) => {
            unify_cons(subs, &a, pattern, &b, elements, depth)
        }
        (Value::List(elements), Value::Cons(pattern)) => {
            unify_cons(subs, &b, pattern, &a, elements, depth)
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| unify_nodes(subs, &a.sub(x), &b.sub(y), depth + 1))
        }
        (Value::Call(f), Value::Call(g)) => {
            f.name == g.name
                && f.args.len() == g.args.len()
                && f.args
                    .iter()
                    .zip(g.args.iter())
                    .all(|(x, y)| unify_nodes(subs, &a.sub(x), &b.sub(y), depth + 1))
        }
        _ => false,
    }
}

/// A cons pattern takes apart a non-empty concrete list: head against the
/// first element, tail against the rest. The empty list matches no pattern.
fn unify_cons(
    subs: &mut Substitution,
    pattern_node: &Tagged,
    pattern: &super::terms::Cons,
    list_node: &Tagged,
    elements: &[Term],
    depth: usize,
) -> bool {
    let Some(first) = elements.first() else {
        return false;
    };
    let rest = Term::from(Value::List(elements[1..].to_vec()));
    unify_nodes(
        subs,
        &pattern_node.sub(&pattern.head),
        &list_node.sub(first),
        depth + 1,
    ) && unify_nodes(
        subs,
        &pattern_node.sub(&pattern.tail),
        &list_node.sub(&rest),
        depth + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::super::counter::Counter;
    use super::super::parser::parse_query;
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Call {
        parse_query(&Counter::with_start(1), src).unwrap()
    }

    /// Unify two freshly parsed goals with empty environments.
    fn try_unify(head: &str, query: &str) -> Option<(Bindings, Bindings)> {
        let mut head_env = Bindings::new();
        let mut query_env = Bindings::new();
        unify(&parse(head), &parse(query), &mut head_env, &mut query_env)
            .then_some((head_env, query_env))
    }

    #[test]
    fn test_name_and_arity_mismatch() {
        assert!(try_unify("p(a)", "q(a)").is_none());
        assert!(try_unify("p(a)", "p(a,b)").is_none());
        assert!(try_unify("p", "p(a)").is_none());
    }

    #[test]
    fn test_constants() {
        assert!(try_unify("p(a,b)", "p(a,b)").is_some());
        assert!(try_unify("p(a)", "p(b)").is_none());
        // Numbers keep numeric identity: 2 and 2.0 are the same value.
        assert!(try_unify("p(2)", "p(2.0)").is_some());
        assert!(try_unify("p(2)", "p(3)").is_none());
        assert!(try_unify("p(2)", "p(a)").is_none());
    }

    #[test]
    fn test_variable_binding_and_writeback() {
        let (head_env, query_env) = try_unify("p(X,b)", "p(a,Y)").unwrap();
        assert_eq!(head_env, btreemap! { sym!("X") => term!("a") });
        assert_eq!(query_env, btreemap! { sym!("Y") => term!("b") });
    }

    #[test]
    fn test_same_name_different_sides_do_not_collide() {
        // `X` in the head and `X` in the query are distinct variables.
        let (head_env, query_env) = try_unify("p(X,a)", "p(b,X)").unwrap();
        assert_eq!(head_env, btreemap! { sym!("X") => term!("b") });
        assert_eq!(query_env, btreemap! { sym!("X") => term!("a") });
    }

    #[test]
    fn test_prebound_environments_are_monotonic() {
        let head = parse("p(X)");
        let query = parse("p(a)");
        let mut head_env: Bindings = btreemap! { sym!("X") => term!("b") };
        let mut query_env = Bindings::new();
        // X is already b; rebinding it to a must fail the branch.
        assert!(!unify(&head, &query, &mut head_env, &mut query_env));

        let mut head_env: Bindings = btreemap! { sym!("X") => term!("a") };
        assert!(unify(&head, &query, &mut head_env, &mut query_env));
        assert_eq!(head_env, btreemap! { sym!("X") => term!("a") });
    }

    #[test]
    fn test_occurs_check() {
        // Binding X to a structure containing X must fail, not loop.
        assert!(try_unify("p(X,X)", "p([Y],Y)").is_none());
        assert!(try_unify("p(X,[X|T])", "p(Y,Y)").is_none());
    }

    #[test]
    fn test_wildcard_independence() {
        // Each `_` is fresh: the two positions stay unconstrained.
        assert!(try_unify("p([_,_])", "p([a,b])").is_some());
        // The same named variable in two positions is one variable.
        assert!(try_unify("p([X,X])", "p([a,b])").is_none());
        assert!(try_unify("p([X,X])", "p([a,a])").is_some());
    }

    #[test]
    fn test_top_level_wildcard_skipped() {
        let (head_env, _) = try_unify("p(_,b)", "p(a,b)").unwrap();
        assert!(head_env.is_empty());
    }

    #[test]
    fn test_cons_decomposition() {
        let (head_env, _) = try_unify("p([H|T])", "p([a,b,c])").unwrap();
        assert_eq!(head_env[&sym!("H")], term!("a"));
        assert_eq!(
            head_env[&sym!("T")],
            term!(value!([value!("b"), value!("c")]))
        );

        // One-element list: the tail is the empty list.
        let (head_env, _) = try_unify("p([H|T])", "p([a])").unwrap();
        assert_eq!(head_env[&sym!("T")], term!(value!([])));

        // The empty list has no head to take.
        assert!(try_unify("p([H|T])", "p([])").is_none());
    }

    #[test]
    fn test_multi_element_cons_head() {
        let (head_env, _) = try_unify("p([A,B|T])", "p([1,2,3,4])").unwrap();
        assert_eq!(head_env[&sym!("A")], term!(value!(1)));
        assert_eq!(head_env[&sym!("B")], term!(value!(2)));
        assert_eq!(
            head_env[&sym!("T")],
            term!(value!([value!(3), value!(4)]))
        );
    }

    #[test]
    fn test_lists_unify_pairwise() {
        assert!(try_unify("p([a,b])", "p([a,b])").is_some());
        assert!(try_unify("p([a,b])", "p([a,b,c])").is_none());
        assert!(try_unify("p([a,b])", "p([a,c])").is_none());
        let (head_env, _) = try_unify("p([X,[Y,b]])", "p([a,[c,b]])").unwrap();
        assert_eq!(head_env[&sym!("X")], term!("a"));
        assert_eq!(head_env[&sym!("Y")], term!("c"));
    }

    #[test]
    fn test_variable_chains_resolve_through_both_sides() {
        // Head X = query Z, query Z = a, so X resolves all the way to a.
        let (head_env, query_env) = try_unify("p(X,X)", "p(Z,a)").unwrap();
        assert_eq!(head_env[&sym!("X")], term!("a"));
        assert_eq!(query_env[&sym!("Z")], term!("a"));
    }

    #[test]
    fn test_depth_cap_fails_instead_of_overflowing() {
        let mut depth_term = String::from("x");
        for _ in 0..(MAX_UNIFY_DEPTH + 10) {
            depth_term = format!("[{}]", depth_term);
        }
        assert!(try_unify(&format!("p({})", depth_term), &format!("p({})", depth_term)).is_none());
    }
}

