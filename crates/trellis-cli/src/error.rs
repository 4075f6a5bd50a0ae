use std::io;

use thiserror::Error;
use trellis_core::auth::{AuthError, LoginError};
use trellis_core::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] trellis_core::Error),
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0} must not be empty")]
    EmptyArgument(&'static str),
    #[error("Not signed in. Run `trellis auth login --email <email> --password <password>` first.")]
    NotSignedIn,
    #[error("No {0} selected. Run `trellis {0} select <id>` first.")]
    NoSelection(&'static str),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("--data must be a JSON object")]
    InvalidData,
    #[error("Media URL must include http:// or https://: {0}")]
    InvalidMediaUrl(String),
    #[error(
        "Supabase is not configured. Run `trellis config init` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    NotConfigured,
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}
