//! Error types for the hosts record store
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for hosts-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the record store, persistence and scheduler
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier is not a valid UUID
    #[error("invalid ID: {0}")]
    InvalidId(String),

    /// Record name does not match the hostname pattern
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Target is not an IPv4 or IPv6 literal
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// No record with the given ID
    #[error("no record found with ID {0}")]
    NotFound(String),

    /// Another record already uses the name
    #[error("a record named {0} already exists")]
    AlreadyExists(String),

    /// Snapshot could not be read or written
    #[error("storage error: {0}")]
    StorageIo(String),

    /// Snapshot file exists but cannot be parsed
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// ID generation kept colliding with existing records
    #[error("unable to allocate a unique record ID after {attempts} attempts")]
    IdExhausted {
        /// Number of generated candidates
        attempts: usize,
    },

    /// Derived artifact could not be regenerated
    #[error("export error: {0}")]
    Export(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by request layers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed client input
    BadInput,
    /// Referenced record does not exist
    NotFound,
    /// Uniqueness conflict
    Conflict,
    /// Infrastructure failure
    Internal,
}

impl Error {
    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create an invalid name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Create an invalid target error
    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTarget(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an "already exists" error
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a storage I/O error
    pub fn storage_io(msg: impl Into<String>) -> Self {
        Self::StorageIo(msg.into())
    }

    /// Create a corrupt snapshot error
    pub fn corrupt_snapshot(msg: impl Into<String>) -> Self {
        Self::CorruptSnapshot(msg.into())
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Map the error onto one of the four response classes
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidId(_) | Self::InvalidName(_) | Self::InvalidTarget(_) => {
                ErrorClass::BadInput
            }
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::AlreadyExists(_) => ErrorClass::Conflict,
            Self::StorageIo(_)
            | Self::CorruptSnapshot(_)
            | Self::IdExhausted { .. }
            | Self::Export(_)
            | Self::Config(_)
            | Self::Other(_) => ErrorClass::Internal,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
