//! Error types for trellis-core

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using trellis-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trellis-core store and data operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the data service
    #[error("Remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation needs a signed-in user
    #[error("Not logged in")]
    NotSignedIn,

    /// Operation needs a selected workspace or project
    #[error("Missing selection: {0}")]
    MissingSelection(&'static str),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}
