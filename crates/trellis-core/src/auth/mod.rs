//! Authentication: the Supabase auth client, the login guard, and the
//! session layer that ties them together.

mod client;
mod guard;
mod login;
pub mod refresh;
mod validation;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::unix_timestamp_now;

pub use client::{normalize_auth_url, SupabaseAuthClient};
pub use guard::{GuardCheck, GuardState, GuardStore, LockState, LoginGuard, MemoryGuardStore};
pub use login::{Authenticator, LoginError, LoginErrorKind};
pub use refresh::{SessionRefresher, SessionSlot};
pub use validation::{
    validate_credentials, validate_email, validate_password, FormatViolation, PASSWORD_SYMBOLS,
};

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Name shown in activity entries.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_timestamp_now())
    }

    #[must_use]
    pub const fn is_expired_at(&self, unix_now: i64) -> bool {
        self.expires_at <= unix_now + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Email/password pair submitted by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Supabase auth is not configured for this build.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The service refused the submitted credentials.
    #[error("Credentials rejected: {0}")]
    Rejected(String),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Remote auth operations the session layer depends on.
pub trait AuthBackend: Send + Sync + 'static {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<AuthSession>> + Send;

    /// Current session, refreshed when the stored token has expired.
    fn get_session(&self) -> impl Future<Output = AuthResult<Option<AuthSession>>> + Send;

    fn sign_out(&self, access_token: &str) -> impl Future<Output = AuthResult<()>> + Send;
}
