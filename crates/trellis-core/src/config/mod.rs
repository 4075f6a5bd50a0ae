//! Runtime configuration.
//!
//! `ServiceConfig` locates the hosted Supabase project. `GuardPolicy` and
//! `RefreshPolicy` tune the login guard and the background session refresh;
//! both have defaults and accept environment overrides.

use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT_SECONDS: i64 = 15 * 60;
pub const DEFAULT_SESSION_REFRESH_SECONDS: u64 = 4 * 60 * 60;

const URL_ENV_KEYS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URI"];
const ANON_KEY_ENV_KEYS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_KEY"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Supabase URL and anon key must be configured together")]
    Incomplete,
    #[error("Supabase URL must include http:// or https://: {0}")]
    InvalidUrl(String),
    #[error("Supabase anon key must not be empty")]
    EmptyAnonKey,
}

/// Endpoint and public key for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl ServiceConfig {
    pub fn new(url: impl AsRef<str>, anon_key: impl AsRef<str>) -> Result<Self, ConfigError> {
        let url = url.as_ref().trim().trim_end_matches('/');
        if !is_http_url(url) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        let anon_key = anon_key.as_ref().trim();
        if anon_key.is_empty() {
            return Err(ConfigError::EmptyAnonKey);
        }

        Ok(Self {
            supabase_url: url.to_string(),
            supabase_anon_key: anon_key.to_string(),
        })
    }

    /// Resolve from optional parts. Both absent means "not configured".
    pub fn resolve(
        url: Option<String>,
        anon_key: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (normalize_text_option(url), normalize_text_option(anon_key)) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => Self::new(url, anon_key).map(Some),
            _ => Err(ConfigError::Incomplete),
        }
    }

    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key: &&str| normalize_text_option(lookup(key)))
        };
        Self::resolve(first(&URL_ENV_KEYS[..]), first(&ANON_KEY_ENV_KEYS[..]))
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }
}

/// Thresholds for the login guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub max_attempts: u32,
    pub lockout_duration: TimeDelta,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            lockout_duration: TimeDelta::seconds(DEFAULT_LOCKOUT_SECONDS),
        }
    }
}

impl GuardPolicy {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(max_attempts) =
            parse_positive::<u32>("TRELLIS_MAX_LOGIN_ATTEMPTS", &lookup)
        {
            policy.max_attempts = max_attempts;
        }
        if let Some(seconds) = parse_positive::<i64>("TRELLIS_LOCKOUT_SECONDS", &lookup) {
            match TimeDelta::try_seconds(seconds) {
                Some(duration) => policy.lockout_duration = duration,
                None => tracing::warn!(
                    key = "TRELLIS_LOCKOUT_SECONDS",
                    value = seconds,
                    "Ignoring out-of-range override; using default"
                ),
            }
        }
        policy
    }
}

/// Cadence of the background session refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SESSION_REFRESH_SECONDS),
        }
    }
}

impl RefreshPolicy {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        parse_positive::<u64>("TRELLIS_SESSION_REFRESH_SECONDS", &lookup).map_or_else(
            Self::default,
            |seconds| Self {
                interval: Duration::from_secs(seconds),
            },
        )
    }
}

fn parse_positive<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let raw = normalize_text_option(lookup(key))?;
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid override; using default");
            None
        }
    }
}
