//! Shared types and unified error handling for the shardscan scan engine.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ByteRange, InfoRecord};
