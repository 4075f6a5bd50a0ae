//! Background session refresh.
//!
//! A `SessionRefresher` owns a tokio task that re-validates the session on a
//! fixed interval. Cancelling the refresher, or dropping it, stops the task.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{AuthBackend, AuthSession, AuthUser};

/// Shared holder for the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionSlot {
    pub fn get(&self) -> Option<AuthSession> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.get().map(|session| session.user)
    }

    pub fn set(&self, session: Option<AuthSession>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub fn take(&self) -> Option<AuthSession> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

pub struct SessionRefresher {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SessionRefresher {
    /// Start refreshing `slot` every `period`. The first check happens one
    /// full period after spawning.
    pub fn spawn<B: AuthBackend>(backend: Arc<B>, period: Duration, slot: SessionSlot) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(backend, period, slot, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "Session refresh task ended abnormally");
            }
        }
    }
}

impl Drop for SessionRefresher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<B: AuthBackend>(
    backend: Arc<B>,
    period: Duration,
    slot: SessionSlot,
    cancel: CancellationToken,
) {
    tracing::debug!(interval_secs = period.as_secs(), "Session refresh started");
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Session refresh stopping");
                break;
            }
            _ = ticker.tick() => {
                match backend.get_session().await {
                    Ok(Some(session)) => {
                        tracing::debug!(expires_at = session.expires_at, "Session refreshed");
                        slot.set(Some(session));
                    }
                    Ok(None) => {
                        tracing::warn!("Session is no longer valid; clearing local session");
                        slot.set(None);
                    }
                    Err(error) => {
                        tracing::error!(%error, "Session refresh failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{session_for, FakeBackend};

    const PERIOD: Duration = Duration::from_secs(4 * 60 * 60);

    #[tokio::test(start_paused = true)]
    async fn refresh_runs_once_per_period() {
        let backend = Arc::new(FakeBackend::default());
        *backend.current.lock().unwrap() = Some(session_for("ada@example.com"));
        let slot = SessionSlot::default();
        let refresher = SessionRefresher::spawn(backend.clone(), PERIOD, slot.clone());

        tokio::time::sleep(PERIOD / 2).await;
        assert_eq!(backend.get_session_count(), 0);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(backend.get_session_count(), 1);
        assert_eq!(
            slot.user().and_then(|user| user.email).as_deref(),
            Some("ada@example.com")
        );

        refresher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_clears_slot_when_session_is_gone() {
        let backend = Arc::new(FakeBackend::default());
        let slot = SessionSlot::default();
        slot.set(Some(session_for("ada@example.com")));
        let _refresher = SessionRefresher::spawn(backend.clone(), PERIOD, slot.clone());

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;

        assert_eq!(backend.get_session_count(), 1);
        assert!(slot.get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_refresher_stops_ticking() {
        let backend = Arc::new(FakeBackend::default());
        let refresher =
            SessionRefresher::spawn(backend.clone(), PERIOD, SessionSlot::default());

        refresher.cancel();
        tokio::time::sleep(PERIOD * 3).await;

        assert_eq!(backend.get_session_count(), 0);
        assert!(!refresher.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_refresher_cancels_task() {
        let backend = Arc::new(FakeBackend::default());
        drop(SessionRefresher::spawn(
            backend.clone(),
            PERIOD,
            SessionSlot::default(),
        ));

        tokio::time::sleep(PERIOD * 2).await;

        assert_eq!(backend.get_session_count(), 0);
    }
}
