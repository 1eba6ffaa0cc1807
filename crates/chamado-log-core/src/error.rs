//! Error types for the chamado-log engine.
//!
//! The taxonomy mirrors the three failure classes the application
//! distinguishes: validation (abort, no state change), parse (recovered
//! locally) and I/O (transient, never fatal to the process).

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the chamado-log engine.
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Validation errors
    // ==========================================================================
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    // ==========================================================================
    // Parse errors
    // ==========================================================================
    #[error("import payload must be a JSON array")]
    ImportFormat,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==========================================================================
    // I/O errors
    // ==========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the failure class this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmptyField(_) => "VALIDATION",
            Self::ImportFormat | Self::Serialization(_) => "PARSE",
            Self::Io(_) => "IO",
        }
    }

    /// Returns whether the error was caused by user input (bad form field,
    /// malformed import file) as opposed to the environment.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyField(_) | Self::ImportFormat | Self::Serialization(_)
        )
    }
}
