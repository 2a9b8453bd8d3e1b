//! Error types for Cauchy Reed-Solomon sharding

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding, decoding or persisting shards
#[derive(Error, Debug)]
pub enum Error {
    /// Bad k/m/file-size combination or malformed caller input
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// I/O error with the operation that caused it
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The destination container already exists
    #[error("Container already exists: {0}")]
    ContainerExists(String),

    // =========================================================================
    // Coding Errors
    // =========================================================================
    /// Internal matrix invariant violated (never for valid parameters)
    #[error("Matrix construction failed: {0}")]
    MatrixConstruction(String),

    /// More shards are missing than the code tolerates
    #[error("Too many erasures: {erased} shards missing, at most {tolerated} can be recovered")]
    TooManyErasures { erased: usize, tolerated: usize },

    /// A shard's length does not match the encoded shard width
    #[error("Inconsistent shard size for {shard}: expected {expected} bytes, got {actual}")]
    InconsistentShardSize {
        shard: String,
        expected: usize,
        actual: usize,
    },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Spec record truncated or malformed
    #[error("Corrupt spec record: {0}")]
    CorruptSpec(String),
}

impl Error {
    /// Wrap an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error stems from bad caller input rather than a runtime failure
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::InvalidParameters(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::ErrorKind;

    #[test]
    fn test_io_error_keeps_context() {
        let err = Error::io("reading box/d1", std::io::Error::from(ErrorKind::PermissionDenied));
        assert_matches!(&err, Error::Io { context, source }
            if context == "reading box/d1" && source.kind() == ErrorKind::PermissionDenied);
        assert!(err.to_string().starts_with("I/O error while reading box/d1: "));
        assert!(!err.is_usage());
    }
}
