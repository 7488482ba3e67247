#[cfg(test)]
#[macro_use]
extern crate maplit;

pub mod error;
#[macro_use]
pub mod macros;
pub mod bindings;
pub mod cache;
pub mod counter;
pub mod formatting;
pub mod horn;
pub mod kb;
pub mod messages;
mod numerics;
pub mod parser;
pub mod rules;
pub mod terms;
pub mod unify;
pub mod vm;
