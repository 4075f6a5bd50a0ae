//! CLI session persistence (keychain) and login guard persistence (file).

#[cfg(test)]
use std::collections::HashMap;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use trellis_core::auth::{
    AuthError, AuthResult, AuthSession, Authenticator, GuardState, GuardStore, LoginGuard,
    SessionPersistence, SupabaseAuthClient,
};
use trellis_core::clock::SystemClock;
use trellis_core::config::{GuardPolicy, RefreshPolicy, ServiceConfig};

use crate::config_profiles::guard_state_path;
use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "trellis-cli";

pub type CliAuthClient = SupabaseAuthClient<SessionStore>;
pub type CliAuthenticator = Authenticator<CliAuthClient>;

#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("supabase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let store = Self::test_store();
        let guard = store
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw).map_err(AuthError::from))
            .transpose()
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(())
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let store = Self::test_store();
        let mut guard = store
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let store = Self::test_store();
        let mut guard = store
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Guard state kept in a JSON file so lockout survives between invocations.
pub struct FileGuardStore {
    path: PathBuf,
}

impl FileGuardStore {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl GuardStore for FileGuardStore {
    fn load(&self) -> AuthResult<Option<GuardState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &GuardState) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, raw).map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

/// Authenticator for a profile: keychain-backed client plus file-backed guard.
pub fn build_authenticator(
    profile_name: &str,
    service: &ServiceConfig,
) -> Result<CliAuthenticator, CliError> {
    let guard_path = guard_state_path(profile_name).map_err(CliError::Config)?;
    build_authenticator_with_guard(profile_name, service, FileGuardStore::new(guard_path))
}

pub fn build_authenticator_with_guard(
    profile_name: &str,
    service: &ServiceConfig,
    guard_store: impl GuardStore + 'static,
) -> Result<CliAuthenticator, CliError> {
    let client = SupabaseAuthClient::from_config(service, SessionStore::new(profile_name))?;
    let guard = LoginGuard::with_store(GuardPolicy::from_env(), Box::new(guard_store));
    Ok(Authenticator::with_parts(
        std::sync::Arc::new(client),
        SystemClock,
        guard,
        RefreshPolicy::from_env(),
    ))
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<AuthSession>> {
    SessionStore::new(profile_name).load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}
