mod command;
mod config;
pub mod constants;
mod engine;
mod errors;
pub mod hook;
pub mod metrics;
mod notify;
mod store;
pub mod utils;

pub use command::*;
pub use config::*;
pub use engine::*;
pub use errors::*;
pub use notify::*;
pub use store::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
