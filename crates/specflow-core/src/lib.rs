//! Specflow core types shared by every layer.

pub mod error;
pub mod status;

pub use error::{Error, Result};
pub use status::WorkStatus;
