//! Error types for clut-core operations.
//!
//! # Categories
//!
//! - **Parse errors**: [`Error::Param`], [`Error::Json`]
//! - **Configuration errors**: [`Error::Config`], [`Error::Yaml`]
//! - **I/O errors**: [`Error::Io`]

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by core types.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter descriptor array was malformed.
    #[error("invalid parameter definition: {0}")]
    Param(String),

    /// Configuration could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// A parameter value was missing or of the wrong shape.
    #[error("invalid value for parameter `{name}`: {reason}")]
    Value {
        /// Parameter name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
