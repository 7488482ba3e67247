//! Memoization of query results by shape.
//!
//! Two queries share a cache entry when they differ only in the names of
//! their top-level variables: `member(X,[a,b])` and `member(Q,[a,b])` have
//! the same shape. Cached binding sets are stored under positional
//! placeholder names and rewritten to the caller's names on replay.
//!
//! The cache is never invalidated. Clauses added after a shape has been
//! cached are invisible to that shape until `clear` is called; callers that
//! mutate the store mid-session must account for this.

use std::collections::HashMap;

use super::terms::{Call, Symbol, Value};
use super::vm::Answer;

fn placeholder(position: usize) -> Symbol {
    Symbol(format!("Var{}", position))
}

/// A query's variable-erased shape, plus the caller's variable name for
/// each erased position.
#[derive(Debug, Clone)]
pub struct QueryShape {
    pub key: String,
    vars: Vec<(usize, Symbol)>,
}

/// Compute the shape of a query goal by replacing every top-level variable
/// argument with a positional placeholder.
pub fn shape_of(query: &Call) -> QueryShape {
    let mut vars = vec![];
    let parts = query
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| match arg.value() {
            Value::Variable(name) => {
                vars.push((i, name.clone()));
                placeholder(i).0
            }
            _ => arg.to_string(),
        })
        .collect::<Vec<String>>()
        .join(",");
    QueryShape {
        key: format!("{}({})", query.name, parts),
        vars,
    }
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, Vec<Answer>>,
}

impl QueryCache {
    /// Replay a cached result for this shape, rewriting placeholder names
    /// to the caller's variable names.
    pub fn lookup(&self, shape: &QueryShape) -> Option<Vec<Answer>> {
        let cached = self.entries.get(&shape.key)?;
        Some(
            cached
                .iter()
                .map(|answer| {
                    rename(answer, |name| {
                        shape
                            .vars
                            .iter()
                            .find(|(i, _)| placeholder(*i) == *name)
                            .map(|(_, caller)| caller.clone())
                            .unwrap_or_else(|| name.clone())
                    })
                })
                .collect(),
        )
    }

    /// Store a computed result under this shape, normalizing the caller's
    /// variable names to positional placeholders.
    pub fn store(&mut self, shape: &QueryShape, answers: &[Answer]) {
        let normalized = answers
            .iter()
            .map(|answer| {
                rename(answer, |name| {
                    shape
                        .vars
                        .iter()
                        .find(|(_, caller)| caller == name)
                        .map(|(i, _)| placeholder(*i))
                        .unwrap_or_else(|| name.clone())
                })
            })
            .collect();
        self.entries.insert(shape.key.clone(), normalized);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn rename(answer: &Answer, f: impl Fn(&Symbol) -> Symbol) -> Answer {
    match answer {
        Answer::Bindings(bindings) => Answer::Bindings(
            bindings
                .iter()
                .map(|(name, value)| (f(name), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_erases_variable_names() {
        let a = shape_of(&call!("member", [value!(sym!("X")), value!([value!(1), value!(2)])]));
        let b = shape_of(&call!("member", [value!(sym!("Q")), value!([value!(1), value!(2)])]));
        assert_eq!(a.key, "member(Var0,[1,2])");
        assert_eq!(a.key, b.key);

        let ground = shape_of(&call!("member", [value!(1), value!([value!(1)])]));
        assert_eq!(ground.key, "member(1,[1])");
    }

    #[test]
    fn test_replay_rewrites_to_caller_names() {
        let mut cache = QueryCache::default();
        let first = shape_of(&call!("parent", ["tom", value!(sym!("X"))]));
        cache.store(
            &first,
            &[Answer::Bindings(btreemap! { sym!("X") => term!("bob") })],
        );

        let second = shape_of(&call!("parent", ["tom", value!(sym!("Kid"))]));
        assert_eq!(
            cache.lookup(&second),
            Some(vec![Answer::Bindings(
                btreemap! { sym!("Kid") => term!("bob") }
            )])
        );
    }

    #[test]
    fn test_sentinels_replay_untouched() {
        let mut cache = QueryCache::default();
        let shape = shape_of(&call!("parent", ["tom", "bob"]));
        cache.store(&shape, &[Answer::Yes]);
        assert_eq!(cache.lookup(&shape), Some(vec![Answer::Yes]));
    }

    #[test]
    fn test_different_shapes_miss() {
        let mut cache = QueryCache::default();
        let shape = shape_of(&call!("parent", ["tom", value!(sym!("X"))]));
        cache.store(&shape, &[Answer::Yes]);
        let other = shape_of(&call!("parent", [value!(sym!("X")), "bob"]));
        assert!(cache.lookup(&other).is_none());
    }
}
