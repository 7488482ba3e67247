use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::bindings::Bindings;
use super::cache::QueryCache;
use super::counter::Counter;
use super::error::{HornResult, RuntimeError};
use super::parser;
use super::rules::{Bucket, Clause};
use super::terms::{Call, Symbol};
use super::unify::unify;
use super::vm::Answer;

/// The clause store: per-predicate buckets of facts and rules, the fresh
/// name counter shared with the parser, and the query cache.
#[derive(Default)]
pub struct KnowledgeBase {
    buckets: HashMap<Symbol, Bucket>,
    counter: Counter,
    cache: QueryCache,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }

    /// Insert a parsed clause into its predicate's bucket.
    pub fn add_clause(&mut self, clause: Clause) {
        self.buckets
            .entry(clause.head.name.clone())
            .or_default()
            .add(Arc::new(clause));
    }

    /// Parse and insert one clause.
    pub fn assert(&mut self, src: &str) -> HornResult<()> {
        let clause = parser::parse_clause(&self.counter, src)?;
        self.add_clause(clause);
        Ok(())
    }

    /// Load clauses from text, one per non-empty line. Lines starting with
    /// `%` are comments. A parse error on any line aborts the load.
    pub fn load_str(&mut self, src: &str) -> HornResult<()> {
        for line in src.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let clause = parser::parse_clause(&self.counter, line)?;
            self.add_clause(clause);
        }
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> HornResult<()> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|e| RuntimeError::FileLoading {
            msg: format!("{}: {}", path.display(), e),
        })?;
        self.load_str(&src)
    }

    pub fn contains(&self, predicate: &Symbol) -> bool {
        self.buckets.contains_key(predicate)
    }

    /// Every clause stored for `predicate`, in bucket (sorted) order.
    pub fn clauses_for(&self, predicate: &Symbol) -> Option<&[Arc<Clause>]> {
        self.buckets.get(predicate).map(Bucket::clauses)
    }

    pub fn first_clause(&self, predicate: &Symbol) -> Option<&Arc<Clause>> {
        self.clauses_for(predicate)?.first()
    }

    /// Fact fast-path: unify the query directly against the predicate's
    /// facts, narrowing by binary range lookup when the first argument is
    /// ground. Rules are skipped here; the resolution engine handles them.
    pub fn fact_answers(&self, query: &Call) -> Vec<Answer> {
        let Some(bucket) = self.buckets.get(&query.name) else {
            return vec![];
        };
        let (first, last) = match query.args.first() {
            Some(arg) if arg.is_ground() => bucket.range(&arg.to_string()),
            _ => (0, bucket.len()),
        };
        let mut answers = vec![];
        for clause in &bucket.clauses()[first..last] {
            if !clause.is_fact() || clause.head.args.len() != query.args.len() {
                continue;
            }
            let mut head_env = Bindings::new();
            let mut query_env = Bindings::new();
            if unify(&clause.head, query, &mut head_env, &mut query_env) {
                if query_env.is_empty() {
                    answers.push(Answer::Yes);
                } else {
                    answers.push(Answer::Bindings(query_env));
                }
            }
        }
        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kb_from(src: &str) -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.load_str(src).unwrap();
        kb
    }

    #[test]
    fn test_load_and_lookup() {
        let kb = kb_from(indoc! {"
            % the royal family
            parent(tom,bob).
            parent(bob,ann).

            grandparent(X,Z) :- parent(X,Y), parent(Y,Z).
        "});
        assert!(kb.contains(&sym!("parent")));
        assert!(kb.contains(&sym!("grandparent")));
        assert!(!kb.contains(&sym!("sibling")));
        assert_eq!(kb.clauses_for(&sym!("parent")).unwrap().len(), 2);
    }

    #[test]
    fn test_load_surfaces_parse_errors() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.load_str("parent(tom,bob").is_err());
    }

    #[test]
    fn test_buckets_sort_by_first_argument() {
        let kb = kb_from(indoc! {"
            parent(tom,bob).
            parent(ann,sue).
            parent(bob,ann).
        "});
        let keys: Vec<String> = kb
            .clauses_for(&sym!("parent"))
            .unwrap()
            .iter()
            .map(|c| c.sort_key())
            .collect();
        assert_eq!(keys, vec!["ann", "bob", "tom"]);
    }

    #[test]
    fn test_fact_answers_ground_query() {
        let kb = kb_from("parent(tom,bob).\nparent(bob,ann).");
        assert_eq!(
            kb.fact_answers(&call!("parent", ["tom", "bob"])),
            vec![Answer::Yes]
        );
        assert!(kb
            .fact_answers(&call!("parent", ["tom", "ann"]))
            .is_empty());
    }

    #[test]
    fn test_fact_answers_variable_query() {
        let kb = kb_from("parent(tom,bob).\nparent(tom,liz).");
        let answers = kb.fact_answers(&call!("parent", ["tom", value!(sym!("X"))]));
        assert_eq!(
            answers,
            vec![
                Answer::Bindings(btreemap! { sym!("X") => term!("bob") }),
                Answer::Bindings(btreemap! { sym!("X") => term!("liz") }),
            ]
        );
    }

    #[test]
    fn test_fact_answers_skip_rules() {
        let kb = kb_from(indoc! {"
            parent(tom,bob).
            ancestor(X,Y) :- parent(X,Y).
        "});
        // Rules never answer from the fast path.
        assert!(kb
            .fact_answers(&call!("ancestor", ["tom", "bob"]))
            .is_empty());
    }

    #[test]
    fn test_load_file_missing_is_an_error() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.load_file("/definitely/not/here.pl").is_err());
    }
}
