//! Unified error handling for shardscan
//!
//! Every fallible operation in the scan engine returns `shardscan_core::Result`,
//! built around a single [`Error`] enum so callers don't have to juggle one
//! error type per component.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all shardscan operations
#[derive(Error, Debug)]
pub enum Error {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Memory-mapping a file failed
    #[error("failed to memory-map {path}: {source}")]
    Mmap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input does not satisfy the unscannable-preconditions check (§6): not a
    /// regular file, or zero-length.
    #[error("unscannable input: {path}")]
    Unscannable { path: PathBuf },

    /// A parser rejected a candidate region. Recovered locally by scanners;
    /// surfaced here only when propagated past the point it can be handled.
    #[error("parser {parser} failed: {message}")]
    ParseFail { parser: String, message: String },

    /// A plugin constructor raised during instantiation (treated as
    /// `ParseFail` for that candidate per §7).
    #[error("registry error: {0}")]
    Registry(String),

    /// Carving a byte range to a child file failed.
    #[error("failed to carve [{offset}, {offset_plus_length}) from {path}: {source}")]
    Carve {
        path: PathBuf,
        offset: u64,
        offset_plus_length: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Result type using the unified [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a [`Error::ParseFail`] from a parser name and diagnostic message.
    pub fn parse_fail(parser: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ParseFail {
            parser: parser.into(),
            message: message.into(),
        }
    }

    /// True for the "locally recoverable" kind of error a scanner should
    /// treat as "try the next candidate" rather than propagate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ParseFail { .. } | Error::Registry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fail_is_recoverable() {
        let err = Error::parse_fail("gif", "bad magic");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("gif"));
    }

    #[test]
    fn io_error_is_not_recoverable() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!err.is_recoverable());
    }
}
