//! Helper macros to build terms and clauses, mostly used by tests.

use crate::terms::{Numeric, Symbol, Value};

#[macro_export]
macro_rules! sym {
    ($name:expr) => {
        $crate::terms::Symbol::new($name)
    };
}

#[macro_export]
macro_rules! value {
    ([$($args:expr),* $(,)?]) => {
        $crate::terms::Value::List(vec![
            $($crate::terms::Term::from(value!($args))),*
        ])
    };
    ($arg:expr) => {
        $crate::macros::TestHelper::<$crate::terms::Value>::from($arg).0
    };
}

#[macro_export]
macro_rules! term {
    ($($expr:tt)*) => {
        $crate::terms::Term::from(value!($($expr)*))
    };
}

#[macro_export]
macro_rules! call {
    ($name:expr) => {
        $crate::terms::Call {
            name: sym!($name),
            args: vec![],
        }
    };
    ($name:expr, [$($args:expr),* $(,)?]) => {
        $crate::terms::Call {
            name: sym!($name),
            args: vec![$($crate::terms::Term::from(value!($args))),*],
        }
    };
}

#[macro_export]
macro_rules! op {
    ($op_type:ident, $($args:expr),+) => {
        $crate::terms::Operation {
            operator: $crate::terms::Operator::$op_type,
            args: vec![$($crate::terms::Term::from(value!($args))),+],
        }
    };
}

#[macro_export]
macro_rules! clause {
    ($name:expr, [$($args:expr),* $(,)?]) => {
        $crate::rules::Clause::fact(call!($name, [$($args),*]))
    };
    ($name:expr, [$($args:expr),* $(,)?] => $($body:expr),+) => {
        $crate::rules::Clause::new(
            call!($name, [$($args),*]),
            vec![$($crate::terms::Term::from($crate::terms::Value::Call($body))),+],
        )
    };
}

/// Eagerly converting wrapper so the macros above accept numbers, string
/// literals, symbols and already-built values interchangeably.
pub struct TestHelper<T>(pub T);

impl<T> From<T> for TestHelper<T> {
    fn from(other: T) -> Self {
        Self(other)
    }
}

impl From<i64> for TestHelper<Value> {
    fn from(other: i64) -> Self {
        Self(Value::Number(Numeric::Integer(other)))
    }
}

impl From<f64> for TestHelper<Value> {
    fn from(other: f64) -> Self {
        Self(Value::Number(Numeric::Float(other)))
    }
}

impl From<&str> for TestHelper<Value> {
    fn from(other: &str) -> Self {
        Self(Value::String(other.to_string()))
    }
}

/// Symbols stand for variables: `value!(sym!("X"))` is the variable `X`.
impl From<Symbol> for TestHelper<Value> {
    fn from(other: Symbol) -> Self {
        Self(Value::Variable(other))
    }
}
