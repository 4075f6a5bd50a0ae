//! Guarded sign-in and session lifecycle.

use std::sync::Arc;

use chrono::TimeDelta;
use thiserror::Error;

use super::guard::{GuardCheck, LockState, LoginGuard};
use super::refresh::{SessionRefresher, SessionSlot};
use super::validation::{validate_credentials, FormatViolation};
use super::{AuthBackend, AuthError, AuthSession, AuthUser, Credentials};
use crate::clock::{Clock, SystemClock};
use crate::config::{GuardPolicy, RefreshPolicy};
use crate::util::identity_fingerprint;

/// Failure kinds surfaced to the user. None of them are fatal; the
/// authenticator stays usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error(
        "Account is locked. Please try again in {} minutes.",
        .remaining_seconds.div_ceil(60)
    )]
    Locked { remaining_seconds: u64 },
    #[error("{0}")]
    InvalidFormat(FormatViolation),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Authentication service unavailable: {0}")]
    Transport(String),
    #[error("Session storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginErrorKind {
    Locked,
    InvalidFormat,
    InvalidCredentials,
    Transport,
    Storage,
}

impl LoginError {
    pub const fn kind(&self) -> LoginErrorKind {
        match self {
            Self::Locked { .. } => LoginErrorKind::Locked,
            Self::InvalidFormat(_) => LoginErrorKind::InvalidFormat,
            Self::InvalidCredentials => LoginErrorKind::InvalidCredentials,
            Self::Transport(_) => LoginErrorKind::Transport,
            Self::Storage(_) => LoginErrorKind::Storage,
        }
    }

    fn locked_for(remaining: TimeDelta) -> Self {
        Self::Locked {
            remaining_seconds: ceil_seconds(remaining),
        }
    }
}

impl From<AuthError> for LoginError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Rejected(_) => Self::InvalidCredentials,
            AuthError::SecureStorage(detail) => Self::Storage(detail),
            other => Self::Transport(other.to_string()),
        }
    }
}

fn ceil_seconds(remaining: TimeDelta) -> u64 {
    let millis = remaining.num_milliseconds().max(0);
    u64::try_from(millis).map_or(0, |millis| millis.div_ceil(1000))
}

/// Owns the login guard, the current session, and its refresh task.
pub struct Authenticator<B: AuthBackend, C: Clock = SystemClock> {
    backend: Arc<B>,
    clock: C,
    guard: LoginGuard,
    session: SessionSlot,
    refresh_policy: RefreshPolicy,
    refresher: Option<SessionRefresher>,
}

impl<B: AuthBackend> Authenticator<B, SystemClock> {
    pub fn new(backend: B, guard_policy: GuardPolicy) -> Self {
        Self::with_parts(
            Arc::new(backend),
            SystemClock,
            LoginGuard::new(guard_policy),
            RefreshPolicy::default(),
        )
    }
}

impl<B: AuthBackend, C: Clock> Authenticator<B, C> {
    pub fn with_parts(
        backend: Arc<B>,
        clock: C,
        guard: LoginGuard,
        refresh_policy: RefreshPolicy,
    ) -> Self {
        Self {
            backend,
            clock,
            guard,
            session: SessionSlot::default(),
            refresh_policy,
            refresher: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn guard(&self) -> &LoginGuard {
        &self.guard
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.session.get()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.get().is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresher
            .as_ref()
            .is_some_and(SessionRefresher::is_running)
    }

    /// Time left on the current lockout, zero when unlocked.
    pub fn remaining_lockout(&self) -> TimeDelta {
        self.guard.remaining_lockout(self.clock.now())
    }

    pub async fn attempt_login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<AuthSession, LoginError> {
        let identity = identity_fingerprint(&credentials.email);

        if let GuardCheck::Locked { remaining } = self.guard.check_and_maybe_expire(self.clock.now())
        {
            tracing::info!(identity = %identity, "Sign-in refused while locked");
            return Err(LoginError::locked_for(remaining));
        }

        validate_credentials(&credentials.email, &credentials.password)
            .map_err(LoginError::InvalidFormat)?;

        match self
            .backend
            .sign_in(&credentials.email, &credentials.password)
            .await
        {
            Ok(session) => {
                tracing::info!(identity = %identity, "Signed in");
                self.guard.record_success();
                self.install_session(session.clone());
                Ok(session)
            }
            Err(AuthError::Rejected(detail)) => {
                tracing::info!(identity = %identity, detail = %detail, "Sign-in rejected");
                let now = self.clock.now();
                match self.guard.record_failure(now) {
                    LockState::Locked { until } => Err(LoginError::locked_for(until - now)),
                    LockState::Unlocked => Err(LoginError::InvalidCredentials),
                }
            }
            Err(error) => {
                tracing::warn!(identity = %identity, %error, "Sign-in failed without a credential verdict");
                Err(error.into())
            }
        }
    }

    /// Pick up an existing session from the backend, if any.
    pub async fn restore_session(&mut self) -> Option<AuthSession> {
        match self.backend.get_session().await {
            Ok(Some(session)) => {
                self.install_session(session.clone());
                Some(session)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::error!(%error, "Session restoration failed");
                self.clear_session();
                None
            }
        }
    }

    /// Sign out remotely and clear all local auth state. Local state is
    /// cleared even when the remote call fails.
    ///
    /// The guard is only reset when a session was held, and an active lock
    /// is never lifted here: only expiry or a successful sign-in does that.
    pub async fn logout(&mut self) -> Result<(), LoginError> {
        let session = self.session.take();
        self.stop_refresh();

        let Some(session) = session else {
            return Ok(());
        };
        if !self.guard.state().is_locked() {
            self.guard.reset();
        }
        self.backend
            .sign_out(&session.access_token)
            .await
            .map_err(|error| {
                tracing::error!(%error, "Logout failed");
                LoginError::from(error)
            })
    }

    /// Stop the background refresh and wait for the task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.shutdown().await;
        }
    }

    fn install_session(&mut self, session: AuthSession) {
        self.session.set(Some(session));
        self.stop_refresh();
        self.refresher = Some(SessionRefresher::spawn(
            Arc::clone(&self.backend),
            self.refresh_policy.interval,
            self.session.clone(),
        ));
    }

    fn clear_session(&mut self) {
        self.session.set(None);
        self.stop_refresh();
    }

    fn stop_refresh(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.cancel();
        }
    }
}
