//! Error types for the key registry
//!
//! Lookup-style failures surface as `Option::None` at the registry boundary;
//! the variants here are for operations that must explain why they failed.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Key registry errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Family generator is not registered
    #[error("Unknown family: {0}")]
    UnknownFamily(String),

    /// Private key requested while the family is locked
    #[error("Family is locked: {0}")]
    KeyLocked(String),

    /// Account specifier could not be parsed
    #[error("Malformed account specifier: {0}")]
    MalformedSpecifier(String),

    /// Public and private derivation disagree after unlock
    #[error("Derivation inconsistency in family {generator} at index {index}")]
    DerivationInconsistency {
        /// Human-readable generator of the family
        generator: String,
        /// First index whose keys did not match
        index: u32,
    },

    /// Persistence gateway failed or returned corrupt data
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Elliptic-curve derivation failed
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Key material is not a valid curve point or scalar
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Human-readable encoding failed to decode
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error means key material can no longer be trusted.
    ///
    /// Callers must not retry or swallow a fatal error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DerivationInconsistency { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::KeyLocked(_)
            | Error::DerivationInconsistency { .. }
            | Error::KeyDerivation(_)
            | Error::InvalidKey(_) => ErrorCategory::Keys,
            Error::UnknownFamily(_) => ErrorCategory::Family,
            Error::MalformedSpecifier(_) | Error::InvalidEncoding(_) => ErrorCategory::Input,
            Error::PersistenceUnavailable(_) => ErrorCategory::Storage,
            Error::Config(_) | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Key material and derivation
    Keys,
    /// Family registration
    Family,
    /// User-supplied text
    Input,
    /// Persistence gateway
    Storage,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Family => write!(f, "Family"),
            ErrorCategory::Input => write!(f, "Input"),
            ErrorCategory::Storage => write!(f, "Storage"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
