mod util;
pub use util::*;
