//! Goal-stack resolution engine.
//!
//! Proof search is depth-first over an explicit last-in-first-out stack of
//! goal nodes; the only recursion is the bounded traversal inside term
//! unification. Goal nodes live in an arena and are immutable once
//! allocated — advancing a parent past a proven subgoal allocates a fresh
//! node sharing the clause, so sibling branches can never observe each
//! other's bindings.

use std::collections::HashSet;
use std::sync::Arc;

use permute::permute;
use serde::{Deserialize, Serialize};

use super::bindings::{substitute, substitute_call, Bindings};
use super::kb::KnowledgeBase;
use super::messages::MessageQueue;
use super::rules::Clause;
use super::terms::{Call, Numeric, Operation, Operator, Symbol, Term, TermList, Value};
use super::unify::unify;

/// Hard cap on goals popped per query, checked once per pop. Exceeding it
/// ends the search early with whatever answers were already found.
pub const MAX_ITERATIONS: usize = 2000;

/// One answer to a query: a concrete binding of the query's variables, or a
/// bare success/failure sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Bindings(Bindings),
}

type GoalId = usize;

/// One node of the proof search tree: the clause instance being proved, a
/// cursor over its body, the branch's own bindings, and the parent goal
/// whose pending subgoal this one proves.
#[derive(Debug, Clone)]
struct Goal {
    clause: Arc<Clause>,
    cursor: usize,
    env: Bindings,
    parent: Option<GoalId>,
}

#[derive(Debug, Default)]
struct GoalArena {
    nodes: Vec<Goal>,
}

impl GoalArena {
    fn alloc(&mut self, goal: Goal) -> GoalId {
        self.nodes.push(goal);
        self.nodes.len() - 1
    }

    fn get(&self, id: GoalId) -> &Goal {
        &self.nodes[id]
    }
}

/// How a pending subgoal is handled, decided once per inspection. `neq`
/// and `subset` are reserved builtin names; a bare expression is the
/// arithmetic builtin; everything else resolves through stored clauses.
enum Dispatch {
    Arithmetic(Operation),
    Inequality(Call),
    Subset(Call),
    User(Call),
    Unknown,
}

/// The engine's raw output: answers in discovery order, the recorded
/// subproof environments (when asked for), and whether the search ran to
/// genuine exhaustion rather than hitting the budget.
#[derive(Debug)]
pub struct Solution {
    pub answers: Vec<Answer>,
    pub path: Vec<Bindings>,
    pub complete: bool,
}

pub struct Vm<'kb> {
    kb: &'kb KnowledgeBase,
    messages: MessageQueue,
    stop_at_first: bool,
    with_path: bool,
    budget: usize,
    arena: GoalArena,
    stack: Vec<GoalId>,
    answers: Vec<Answer>,
    path: Vec<Bindings>,
}

impl<'kb> Vm<'kb> {
    pub fn new(kb: &'kb KnowledgeBase, messages: MessageQueue) -> Self {
        Self {
            kb,
            messages,
            stop_at_first: false,
            with_path: false,
            budget: MAX_ITERATIONS,
            arena: GoalArena::default(),
            stack: vec![],
            answers: vec![],
            path: vec![],
        }
    }

    /// Stop after the first recorded success instead of exhausting the
    /// search space.
    pub fn stop_at_first(mut self, yes: bool) -> Self {
        self.stop_at_first = yes;
        self
    }

    /// Record the environment of every completed subproof.
    pub fn with_path(mut self, yes: bool) -> Self {
        self.with_path = yes;
        self
    }

    /// Override the iteration budget. Mostly useful in tests.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Run depth-first proof search for `query` to completion or budget
    /// exhaustion.
    pub fn run(mut self, query: &Call) -> Solution {
        // A synthetic root whose single subgoal is the query itself; its
        // environment ends up holding the answer bindings.
        let root = Goal {
            clause: Arc::new(Clause::new(
                Call {
                    name: Symbol::new("?-"),
                    args: vec![],
                },
                vec![Term::from(Value::Call(query.clone()))],
            )),
            cursor: 0,
            env: Bindings::new(),
            parent: None,
        };
        let root_id = self.arena.alloc(root);
        self.stack.push(root_id);

        let mut iterations = 0;
        let mut complete = true;
        while let Some(id) = self.stack.pop() {
            iterations += 1;
            if iterations > self.budget {
                self.messages.warning(format!(
                    "search stopped after {} goals; returning partial results",
                    self.budget
                ));
                complete = false;
                break;
            }
            let goal = self.arena.get(id).clone();
            if goal.cursor >= goal.clause.body.len() {
                match goal.parent {
                    None => {
                        // A completed root is a proof of the original query.
                        if goal.env.is_empty() {
                            self.answers.push(Answer::Yes);
                        } else {
                            self.answers.push(Answer::Bindings(goal.env.clone()));
                        }
                        if self.stop_at_first {
                            break;
                        }
                    }
                    Some(parent_id) => self.ascend(&goal, parent_id),
                }
                continue;
            }
            let pending = goal.clause.body[goal.cursor].clone();
            match self.classify(&pending) {
                Dispatch::Arithmetic(op) => self.solve_expression(&goal, &op),
                Dispatch::Inequality(call) => self.solve_inequality(&goal, &call),
                Dispatch::Subset(call) => self.solve_subset(&goal, &call),
                Dispatch::User(call) => self.expand_user(id, &goal, &call),
                // No clauses means no proof; the branch dies silently.
                Dispatch::Unknown => {}
            }
        }
        Solution {
            answers: self.answers,
            path: self.path,
            complete,
        }
    }

    fn classify(&self, pending: &Term) -> Dispatch {
        match pending.value() {
            Value::Expression(op) => Dispatch::Arithmetic(op.clone()),
            Value::Call(call) if call.name.0 == "neq" && call.args.len() == 2 => {
                Dispatch::Inequality(call.clone())
            }
            Value::Call(call) if call.name.0 == "subset" && call.args.len() == 2 => {
                Dispatch::Subset(call.clone())
            }
            Value::Call(call) if self.kb.contains(&call.name) => Dispatch::User(call.clone()),
            _ => Dispatch::Unknown,
        }
    }

    /// Push a copy of `goal` advanced past its current subgoal, carrying
    /// `env` as the new branch's bindings.
    fn advance(&mut self, goal: &Goal, env: Bindings) {
        let next = Goal {
            clause: goal.clause.clone(),
            cursor: goal.cursor + 1,
            env,
            parent: goal.parent,
        };
        let id = self.arena.alloc(next);
        self.stack.push(id);
    }

    /// A goal with an exhausted body has proven its head. Ground the head
    /// with this goal's own bindings, re-unify the parent's pending subgoal
    /// against the grounded fact, and push an advanced copy of the parent.
    /// Unification failure here is silent branch death.
    fn ascend(&mut self, child: &Goal, parent_id: GoalId) {
        let parent = self.arena.get(parent_id).clone();
        let proven = substitute_call(&child.clause.head, &child.env);
        let pending = match parent.clause.body.get(parent.cursor).map(Term::value) {
            Some(Value::Call(call)) => call.clone(),
            _ => return,
        };
        let mut parent_env = parent.env.clone();
        let mut proven_env = Bindings::new();
        if unify(&pending, &proven, &mut parent_env, &mut proven_env) {
            let advanced = Goal {
                clause: parent.clause.clone(),
                cursor: parent.cursor + 1,
                env: parent_env,
                parent: parent.parent,
            };
            let id = self.arena.alloc(advanced);
            self.stack.push(id);
        }
        if self.with_path {
            self.path.push(child.env.clone());
        }
    }

    /// Evaluate a bare arithmetic or comparison goal under the branch's
    /// bindings. An unbound operand, a non-numeric operand or a failed
    /// checked operation kills the branch; it is never an engine error.
    fn solve_expression(&mut self, goal: &Goal, op: &Operation) {
        let (left, right) = match (op.args.first(), op.args.get(1)) {
            (Some(l), Some(r)) => (substitute(l, &goal.env), substitute(r, &goal.env)),
            _ => return,
        };
        match op.operator {
            Operator::Is => {
                let Some(value) = eval_numeric(&right) else {
                    return;
                };
                match left.value() {
                    Value::Variable(name) => {
                        let mut env = goal.env.clone();
                        env.insert(name.clone(), Term::from(Value::Number(value)));
                        self.advance(goal, env);
                    }
                    // Re-deriving an already-bound value must agree with it.
                    Value::Number(n) if *n == value => self.advance(goal, goal.env.clone()),
                    _ => {}
                }
            }
            Operator::Gt | Operator::Lt | Operator::Geq | Operator::Leq => {
                let (Some(l), Some(r)) = (eval_numeric(&left), eval_numeric(&right)) else {
                    return;
                };
                let holds = match op.operator {
                    Operator::Gt => l > r,
                    Operator::Lt => l < r,
                    Operator::Geq => l >= r,
                    _ => l <= r,
                };
                if holds {
                    self.advance(goal, goal.env.clone());
                }
            }
            // A bare `+`-style goal asserts nothing.
            _ => {}
        }
    }

    /// `neq(A,B)`: the branch dies if both sides resolve to the same ground
    /// value, and continues unchanged otherwise.
    fn solve_inequality(&mut self, goal: &Goal, call: &Call) {
        let left = substitute(&call.args[0], &goal.env);
        let right = substitute(&call.args[1], &goal.env);
        if left.is_ground() && right.is_ground() && left == right {
            return;
        }
        self.advance(goal, goal.env.clone());
    }

    /// `subset(A,B)`, bypassing clause lookup. Both concrete: membership
    /// check. `A` unbound with `B` concrete: one continuation branch per
    /// ordered arrangement of every sub-multiset of `B`, the empty one
    /// included.
    fn solve_subset(&mut self, goal: &Goal, call: &Call) {
        let left = substitute(&call.args[0], &goal.env);
        let right = substitute(&call.args[1], &goal.env);
        let Some(universe) = right.value().as_list() else {
            return;
        };
        match left.value() {
            Value::List(elements) => {
                if elements.iter().all(|e| universe.contains(e)) {
                    self.advance(goal, goal.env.clone());
                }
            }
            Value::Variable(name) => {
                for arrangement in arrangements(universe) {
                    let mut env = goal.env.clone();
                    env.insert(name.clone(), Term::from(Value::List(arrangement)));
                    self.advance(goal, env);
                }
            }
            _ => {}
        }
    }

    /// Expand a user-defined subgoal into one child goal per viable
    /// candidate clause. Every child owns its environment; sibling branches
    /// never share bindings.
    fn expand_user(&mut self, id: GoalId, goal: &Goal, call: &Call) {
        let kb = self.kb;
        let Some(candidates) = kb.clauses_for(&call.name) else {
            return;
        };
        if goal.parent.is_none() {
            // First expansion of the query itself: seed each child's
            // environment by unifying the candidate head against the
            // subgoal under the caller's bindings.
            for clause in candidates {
                if clause.head.args.len() != call.args.len() {
                    continue;
                }
                let mut child_env = Bindings::new();
                let mut caller_env = goal.env.clone();
                if unify(&clause.head, call, &mut child_env, &mut caller_env) {
                    let child = Goal {
                        clause: clause.clone(),
                        cursor: 0,
                        env: child_env,
                        parent: Some(id),
                    };
                    let child_id = self.arena.alloc(child);
                    self.stack.push(child_id);
                }
            }
            return;
        }
        // Deeper in the tree. When no binding constrains the subgoal's
        // variables every same-arity candidate is viable as-is and
        // unification happens on ascent. Otherwise re-check each candidate
        // by full scan — bound substructure makes the sorted-key range
        // shortcut unsound here.
        let constrained = call.args.iter().any(|arg| match arg.value() {
            Value::Variable(name) => goal.env.contains_key(name),
            _ => false,
        });
        for clause in candidates {
            if clause.head.args.len() != call.args.len() {
                continue;
            }
            if goal.env.is_empty() || !constrained {
                let child = Goal {
                    clause: clause.clone(),
                    cursor: 0,
                    env: Bindings::new(),
                    parent: Some(id),
                };
                let child_id = self.arena.alloc(child);
                self.stack.push(child_id);
            } else {
                let mut child_env = Bindings::new();
                let mut caller_env = goal.env.clone();
                if unify(&clause.head, call, &mut child_env, &mut caller_env) {
                    let child = Goal {
                        clause: clause.clone(),
                        cursor: 0,
                        env: child_env,
                        parent: Some(id),
                    };
                    let child_id = self.arena.alloc(child);
                    self.stack.push(child_id);
                }
            }
        }
    }
}

/// Evaluate a substituted term to a number. `None` means the term does not
/// evaluate — an unbound variable, an atom, or arithmetic overflow.
fn eval_numeric(term: &Term) -> Option<Numeric> {
    match term.value() {
        Value::Number(n) => Some(*n),
        Value::Expression(op) => {
            let left = eval_numeric(op.args.first()?)?;
            let right = eval_numeric(op.args.get(1)?)?;
            match op.operator {
                Operator::Add => left + right,
                Operator::Sub => left - right,
                Operator::Mul => left * right,
                Operator::Div => left / right,
                _ => None,
            }
        }
        _ => None,
    }
}

/// Every ordered arrangement of every sub-multiset of `universe`, smallest
/// first. Single-element and empty picks occur exactly once; larger picks
/// contribute all their permutations.
fn arrangements(universe: &[Term]) -> Vec<TermList> {
    let mut out = vec![];
    for size in 0..=universe.len() {
        for combination in combinations(universe, size) {
            if combination.len() <= 1 {
                out.push(combination);
            } else {
                out.extend(permute(combination));
            }
        }
    }
    out
}

/// K-element combinations in index order.
fn combinations(universe: &[Term], size: usize) -> Vec<TermList> {
    if size == 0 {
        return vec![vec![]];
    }
    if size > universe.len() {
        return vec![];
    }
    let mut out = vec![];
    for (i, item) in universe.iter().enumerate() {
        for mut rest in combinations(&universe[i + 1..], size - 1) {
            let mut combination = Vec::with_capacity(size);
            combination.push(item.clone());
            combination.append(&mut rest);
            out.push(combination);
        }
    }
    out
}

/// Post-process a raw answer stream: duplicate bindings collapse, bare
/// successes are dropped once concrete bindings exist, repeated successes
/// collapse to one, and an empty set is failure.
pub fn normalize_answers(answers: Vec<Answer>) -> Vec<Answer> {
    let mut seen = HashSet::new();
    let mut bindings = vec![];
    let mut any_yes = false;
    for answer in answers {
        match &answer {
            Answer::Yes => any_yes = true,
            Answer::No => {}
            Answer::Bindings(_) => {
                if seen.insert(answer.to_string()) {
                    bindings.push(answer);
                }
            }
        }
    }
    if !bindings.is_empty() {
        bindings
    } else if any_yes {
        vec![Answer::Yes]
    } else {
        vec![Answer::No]
    }
}
