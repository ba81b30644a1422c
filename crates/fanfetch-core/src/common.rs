pub mod error;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
