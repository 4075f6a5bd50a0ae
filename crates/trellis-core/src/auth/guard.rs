//! Client-side login attempt limiting.
//!
//! Counts consecutive rejected sign-ins and locks further attempts for a fixed
//! window once the threshold is reached. The guard is cyclic: a lock expires
//! back to `Unlocked` and a successful sign-in always clears it.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::AuthResult;
use crate::config::GuardPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    Locked { until: DateTime<Utc> },
}

/// Snapshot of the guard. Only `LoginGuard` transitions mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardState {
    attempt_count: u32,
    #[serde(default)]
    last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    lock: LockState,
}

impl GuardState {
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub const fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    pub const fn lock(&self) -> LockState {
        self.lock
    }

    pub const fn is_locked(&self) -> bool {
        matches!(self.lock, LockState::Locked { .. })
    }
}

/// Outcome of checking the guard before an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardCheck {
    Open,
    Locked { remaining: TimeDelta },
}

/// Where guard state lives between process runs.
pub trait GuardStore: Send + Sync {
    fn load(&self) -> AuthResult<Option<GuardState>>;
    fn save(&self, state: &GuardState) -> AuthResult<()>;
}

/// Process-local store; state is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuardStore {
    state: Arc<Mutex<Option<GuardState>>>,
}

impl GuardStore for MemoryGuardStore {
    fn load(&self) -> AuthResult<Option<GuardState>> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &GuardState) -> AuthResult<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }
}

pub struct LoginGuard {
    policy: GuardPolicy,
    state: GuardState,
    store: Box<dyn GuardStore>,
}

impl LoginGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self::with_store(policy, Box::new(MemoryGuardStore::default()))
    }

    /// Build a guard seeded from `store`. A store that cannot be read yields a
    /// fresh guard.
    pub fn with_store(policy: GuardPolicy, store: Box<dyn GuardStore>) -> Self {
        let state = match store.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(%error, "Failed to load login guard state; starting fresh");
                GuardState::default()
            }
        };
        Self {
            policy,
            state,
            store,
        }
    }

    pub const fn policy(&self) -> GuardPolicy {
        self.policy
    }

    pub const fn state(&self) -> &GuardState {
        &self.state
    }

    /// Count a rejected attempt. Locks once the threshold is reached.
    ///
    /// Failures reported while already locked are ignored; callers never reach
    /// the remote service in that state.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> LockState {
        if self.state.is_locked() {
            return self.state.lock;
        }

        self.state.attempt_count = self.state.attempt_count.saturating_add(1);
        self.state.last_attempt_at = Some(now);
        if self.state.attempt_count >= self.policy.max_attempts {
            let until = now
                .checked_add_signed(self.policy.lockout_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.state.lock = LockState::Locked { until };
            tracing::warn!(
                attempts = self.state.attempt_count,
                until = %until,
                "Too many failed sign-in attempts; locking"
            );
        } else {
            tracing::debug!(attempts = self.state.attempt_count, "Recorded failed sign-in");
        }
        self.persist();
        self.state.lock
    }

    pub fn record_success(&mut self) {
        self.state.attempt_count = 0;
        self.state.lock = LockState::Unlocked;
        self.persist();
    }

    /// Expire a lapsed lock, or report how long the current one has left.
    pub fn check_and_maybe_expire(&mut self, now: DateTime<Utc>) -> GuardCheck {
        match self.state.lock {
            LockState::Unlocked => GuardCheck::Open,
            LockState::Locked { until } if now >= until => {
                tracing::info!("Sign-in lockout expired");
                self.state.attempt_count = 0;
                self.state.lock = LockState::Unlocked;
                self.persist();
                GuardCheck::Open
            }
            LockState::Locked { until } => GuardCheck::Locked {
                remaining: until - now,
            },
        }
    }

    /// Remaining lock time at `now` without mutating state.
    pub fn remaining_lockout(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.state.lock {
            LockState::Locked { until } if until > now => until - now,
            _ => TimeDelta::zero(),
        }
    }

    /// Forget everything, including the last attempt time.
    pub fn reset(&mut self) {
        self.state = GuardState::default();
        self.persist();
    }

    fn persist(&self) {
        if let Err(error) = self.store.save(&self.state) {
            tracing::warn!(%error, "Failed to persist login guard state");
        }
    }
}
