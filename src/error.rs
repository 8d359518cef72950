//! Error types for sqlrelay.

use thiserror::Error;

/// The main error type for sqlrelay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A registry load found a repeated statement key while duplicate
    /// tolerance was disabled.
    #[error("duplicate key: '{0}'")]
    DuplicateKey(String),

    /// No statement is registered under the given key.
    #[error("unknown statement key: '{0}'")]
    UnknownKey(String),

    /// No mock take could be resolved for the given key.
    #[error("no active mock take for key: '{0}'")]
    MockNotSupported(String),

    /// A resolved mock take has neither a CSV source nor a usable
    /// connection string.
    #[error("mock take for key '{0}' has neither a csv source nor a usable connection string")]
    MockMisconfigured(String),

    /// A CSV field could not be parsed into its declared column type.
    #[error("cannot convert '{value}' in column '{column}' to {expected}")]
    DataConversion {
        column: String,
        value: String,
        expected: &'static str,
    },

    /// A definition file or in-memory definition is structurally invalid.
    #[error("definition error: {0}")]
    Definition(String),

    /// Provider-level database error.
    #[error("database error: {0}")]
    Database(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Create a conversion error for a single CSV field.
    pub fn conversion(
        column: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::DataConversion {
            column: column.into(),
            value: value.into(),
            expected,
        }
    }

    /// Create a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }
}

/// Result type alias for sqlrelay operations.
pub type RelayResult<T> = Result<T, RelayError>;
