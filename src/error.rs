//! Error types for the Segdex library.
//!
//! Every fallible operation returns [`Result`], whose error side is the
//! [`SegdexError`] enum. Each variant corresponds to one failure kind, so
//! callers can branch on [`SegdexError::kind`] instead of parsing messages.
//!
//! # Examples
//!
//! ```
//! use segdex::error::{ErrorKind, Result, SegdexError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SegdexError::capacity("arena full"))
//! }
//!
//! let err = example_operation().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Capacity);
//! assert_eq!(err.to_string(), "Capacity error: arena full");
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Segdex operations.
#[derive(Error, Debug)]
pub enum SegdexError {
    /// Invalid construction parameters (zero arena budget, bad config).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid schema definition.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A document or segment does not conform to the expected schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A builder's arena budget would be exceeded.
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Operation is invalid for the current lifecycle state.
    #[error("State error: {0}")]
    State(String),

    /// Segment bytes could not be decoded.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// The segment instance is already registered in the index.
    #[error("Duplicate segment: {0}")]
    DuplicateSegment(String),

    /// The segment instance is not registered in the index.
    #[error("Segment not registered: {0}")]
    NotRegistered(String),

    /// The engine has not been initialized yet.
    #[error("Engine not initialized: {0}")]
    Uninitialized(String),

    /// The query string or search options are invalid.
    #[error("Query error: {0}")]
    Query(String),

    /// I/O errors raised while encoding or decoding segments.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with SegdexError.
pub type Result<T> = std::result::Result<T, SegdexError>;

/// Discriminant of a [`SegdexError`], without its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Schema,
    SchemaMismatch,
    Capacity,
    State,
    CorruptData,
    DuplicateSegment,
    NotRegistered,
    Uninitialized,
    Query,
    Io,
    Json,
}

impl SegdexError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SegdexError::Config(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        SegdexError::Schema(msg.into())
    }

    /// Create a new schema mismatch error.
    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        SegdexError::SchemaMismatch(msg.into())
    }

    /// Create a new capacity error.
    pub fn capacity<S: Into<String>>(msg: S) -> Self {
        SegdexError::Capacity(msg.into())
    }

    /// Create a new state error.
    pub fn state<S: Into<String>>(msg: S) -> Self {
        SegdexError::State(msg.into())
    }

    /// Create a new corrupt data error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        SegdexError::CorruptData(msg.into())
    }

    /// Create a new duplicate segment error.
    pub fn duplicate_segment<S: Into<String>>(msg: S) -> Self {
        SegdexError::DuplicateSegment(msg.into())
    }

    /// Create a new not-registered error.
    pub fn not_registered<S: Into<String>>(msg: S) -> Self {
        SegdexError::NotRegistered(msg.into())
    }

    /// Create a new uninitialized error.
    pub fn uninitialized<S: Into<String>>(msg: S) -> Self {
        SegdexError::Uninitialized(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SegdexError::Query(msg.into())
    }

    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SegdexError::Config(_) => ErrorKind::Config,
            SegdexError::Schema(_) => ErrorKind::Schema,
            SegdexError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            SegdexError::Capacity(_) => ErrorKind::Capacity,
            SegdexError::State(_) => ErrorKind::State,
            SegdexError::CorruptData(_) => ErrorKind::CorruptData,
            SegdexError::DuplicateSegment(_) => ErrorKind::DuplicateSegment,
            SegdexError::NotRegistered(_) => ErrorKind::NotRegistered,
            SegdexError::Uninitialized(_) => ErrorKind::Uninitialized,
            SegdexError::Query(_) => ErrorKind::Query,
            SegdexError::Io(_) => ErrorKind::Io,
            SegdexError::Json(_) => ErrorKind::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SegdexError::schema("Test schema error");
        assert_eq!(error.to_string(), "Schema error: Test schema error");
        assert_eq!(error.kind(), ErrorKind::Schema);

        let error = SegdexError::state("already finalized");
        assert_eq!(error.to_string(), "State error: already finalized");
        assert_eq!(error.kind(), ErrorKind::State);

        let error = SegdexError::corrupt("bad magic");
        assert_eq!(error.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let error = SegdexError::from(io_error);

        match error {
            SegdexError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
