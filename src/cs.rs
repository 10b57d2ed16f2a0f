pub mod ecc;
pub mod error;

pub use ecc::*;
pub use error::{Error, Result};
