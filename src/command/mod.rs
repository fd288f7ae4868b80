//! Operator commands.
//!
//! Turns chat text such as `watch add /public/a` into reads and conditional
//! writes against the store. The watch list is only ever rewritten with
//! create-only or compare-and-swap writes, so concurrent editors cannot lose
//! each other's updates; the loser is told to try again.

mod dispatcher;
mod parser;
pub use dispatcher::*;
pub use parser::*;
