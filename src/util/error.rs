//! Error types for the FBOM library.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for FBOM operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of stream
    #[error("Invalid FBOM stream: expected FBOM magic bytes")]
    InvalidMagic,

    /// Unsupported format version
    #[error("Unsupported FBOM version: {0}")]
    UnsupportedVersion(u16),

    /// Stream is truncated or corrupted
    #[error("Unexpected end of stream at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in stream
    #[error("Invalid stream structure: {0}")]
    InvalidStructure(String),

    /// Required property not found by name
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Type mismatch when reading data
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// No marshal registered for an object type name
    #[error("Unknown object type: no marshal registered for '{0}'")]
    UnknownObjectType(String),

    /// No marshal registered for a native type
    #[error("No marshal registered for native type '{0}'")]
    NoMarshalForNativeType(&'static str),

    /// Two marshals registered for the same type
    #[error("Marshal collision: '{0}' is already registered")]
    MarshalCollision(String),

    /// Cycle detected in the native object graph during serialization
    #[error("Circular reference detected while serializing '{0}'")]
    CircularReference(String),

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Referenced external object library could not be loaded
    #[error("External library {uuid} could not be loaded: {reason}")]
    ExternalLoad { uuid: Uuid, reason: String },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a type mismatch error from two type descriptions.
    pub fn mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type alias for FBOM operations.
pub type Result<T> = std::result::Result<T, Error>;
