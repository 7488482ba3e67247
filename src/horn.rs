//! The `Horn` façade: the embedding application's entry point.
//!
//! Owns the knowledge base behind a lock, the message queue, and the query
//! orchestration: cache lookup, the fact fast-path, the resolution engine,
//! and answer post-processing.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

use super::bindings::Bindings;
use super::cache;
use super::error::HornResult;
use super::kb::KnowledgeBase;
use super::messages::{Message, MessageQueue};
use super::parser;
use super::terms::{Call, Term};
use super::vm::{normalize_answers, Answer, Vm};

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOpts {
    /// Stop at the first success instead of exhausting the search.
    pub stop_at_first: bool,
    /// Also report the intermediate binding values of the proof.
    pub with_path: bool,
}

#[derive(Debug)]
pub struct QuerySolution {
    /// Ordered answers: binding maps, or a bare success/failure sentinel.
    pub answers: Vec<Answer>,
    /// Proof path values, when requested and freshly computed.
    pub path: Option<Vec<Term>>,
    /// False when the iteration budget cut the search short.
    pub complete: bool,
}

pub struct Horn {
    kb: Arc<RwLock<KnowledgeBase>>,
    messages: MessageQueue,
}

impl Default for Horn {
    fn default() -> Self {
        Self::new()
    }
}

impl Horn {
    pub fn new() -> Self {
        Self {
            kb: Arc::new(RwLock::new(KnowledgeBase::new())),
            messages: MessageQueue::new(),
        }
    }

    /// Load clauses from text, one per non-empty line.
    pub fn load_str(&self, src: &str) -> HornResult<()> {
        self.kb.write().unwrap().load_str(src)
    }

    /// Load clauses from a file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> HornResult<()> {
        let path = path.as_ref();
        self.kb.write().unwrap().load_file(path)?;
        self.messages
            .print(format!("loaded clauses from {}", path.display()));
        Ok(())
    }

    /// Parse and insert one clause. There is no retraction.
    pub fn assert(&self, src: &str) -> HornResult<()> {
        self.kb.write().unwrap().assert(src)
    }

    /// Drop all cached query results. The cache is otherwise never
    /// invalidated, even when clauses are added after a result was cached.
    pub fn clear_cache(&self) {
        self.kb.write().unwrap().cache_mut().clear();
    }

    /// Drain one pending print/warning message.
    pub fn next_message(&self) -> Option<Message> {
        self.messages.next()
    }

    /// Answer a query with default options.
    pub fn query(&self, src: &str) -> HornResult<Vec<Answer>> {
        Ok(self.query_opts(src, QueryOpts::default())?.answers)
    }

    /// Answer a query. Results come from the cache when the query's shape
    /// has been seen before; otherwise facts are tried first and the
    /// resolution engine covers rules, with both answer sets merged.
    pub fn query_opts(&self, src: &str, opts: QueryOpts) -> HornResult<QuerySolution> {
        let mut kb = self.kb.write().unwrap();
        let query = parser::parse_query(kb.counter(), src)?;

        let shape = cache::shape_of(&query);
        if let Some(answers) = kb.cache().lookup(&shape) {
            return Ok(QuerySolution {
                answers,
                path: None,
                complete: true,
            });
        }

        let mut raw = kb.fact_answers(&query);
        let has_vars = query.args.iter().any(|arg| !arg.is_ground());
        let mut complete = true;
        let mut path = None;
        // A ground query settled by facts alone skips the engine; anything
        // else needs rule resolution, merged with the fast-path answers.
        if has_vars || raw.is_empty() {
            let solution = Vm::new(&kb, self.messages.clone())
                .stop_at_first(opts.stop_at_first)
                .with_path(opts.with_path)
                .run(&query);
            complete = solution.complete;
            if opts.with_path {
                path = Some(reduce_path(&kb, &query, &solution.path));
            }
            raw.extend(solution.answers);
        }

        let answers = normalize_answers(raw);
        kb.cache_mut().store(&shape, &answers);
        Ok(QuerySolution {
            answers,
            path,
            complete,
        })
    }
}

/// Reduce recorded subproof environments to the values bound along the way,
/// minus the variables named by the queried predicate's own first clause.
fn reduce_path(kb: &KnowledgeBase, query: &Call, envs: &[Bindings]) -> Vec<Term> {
    let mut skip = HashSet::new();
    if let Some(clause) = kb.first_clause(&query.name) {
        for arg in &clause.head.args {
            arg.variables(&mut skip);
        }
    }
    let mut seen = HashSet::new();
    let mut values = vec![];
    for env in envs {
        for (name, value) in env {
            if skip.contains(name) {
                continue;
            }
            if seen.insert(value.to_string()) {
                values.push(value.clone());
            }
        }
    }
    values
}
