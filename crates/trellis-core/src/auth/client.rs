//! Supabase (GoTrue) auth client.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{AuthBackend, AuthError, AuthResult, AuthSession, AuthUser, SessionPersistence};
use crate::config::ServiceConfig;
use crate::util::unix_timestamp_now;

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    pub fn from_config(config: &ServiceConfig, store: S) -> AuthResult<Self> {
        Self::new(&config.supabase_url, config.supabase_anon_key.clone(), store)
    }

    /// Session stored locally, without touching the network.
    pub fn stored_session(&self) -> AuthResult<Option<AuthSession>> {
        self.store.load_session()
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn password_sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Sign-in response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Refresh response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    pub async fn logout(&self, access_token: &str) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.store.clear_session()?;
        Ok(())
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_api_error(status, &body);
            return Err(if is_credential_rejection(status) {
                AuthError::Rejected(message)
            } else {
                AuthError::Api(message)
            });
        }
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }
}

impl<S: SessionPersistence> AuthBackend for SupabaseAuthClient<S> {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_sign_in(email, password).await
    }

    async fn get_session(&self) -> AuthResult<Option<AuthSession>> {
        self.restore_session().await
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.logout(access_token).await
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

/// GoTrue answers bad email/password pairs with 400 (`invalid_grant`); some
/// deployments use 401/403/422. Rate limiting and server faults are not
/// credential signals.
fn is_credential_rejection(status: StatusCode) -> bool {
    matches!(status.as_u16(), 400 | 401 | 403 | 422)
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
    session: Option<SupabaseAuthResponseSession>,
}

impl SupabaseAuthResponse {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let nested_session = self.session;
        let access_token = self.access_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.access_token.clone())
        });
        let refresh_token = self.refresh_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.refresh_token.clone())
        });
        let expires_at = self
            .expires_at
            .or_else(|| {
                nested_session
                    .as_ref()
                    .and_then(|session| session.expires_at)
            })
            .or_else(|| {
                self.expires_in
                    .or_else(|| {
                        nested_session
                            .as_ref()
                            .and_then(|session| session.expires_in)
                    })
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            });
        let user = self
            .user
            .or_else(|| nested_session.and_then(|session| session.user))
            .map(Into::into);

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponseSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<SupabaseErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[derive(Clone, Default)]
    struct MemoryStore {
        slot: Arc<Mutex<HashMap<&'static str, String>>>,
    }

    impl SessionPersistence for MemoryStore {
        fn load_session(&self) -> AuthResult<Option<AuthSession>> {
            let guard = self.slot.lock().unwrap();
            guard
                .get("session")
                .map(|raw| serde_json::from_str(raw).map_err(Into::into))
                .transpose()
        }

        fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
            let raw = serde_json::to_string(session)?;
            self.slot.lock().unwrap().insert("session", raw);
            Ok(())
        }

        fn clear_session(&self) -> AuthResult<()> {
            self.slot.lock().unwrap().remove("session");
            Ok(())
        }
    }

    async fn spawn_one_shot_server(status_line: &str, body: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = [0_u8; 4096];
                let _ = socket.read(&mut request_buffer).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{address}")
    }

    #[test]
    fn normalize_auth_url_appends_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_keeps_existing_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn response_without_session_fields_means_no_session() {
        let response = SupabaseAuthResponse {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            expires_in: None,
            user: Some(SupabaseUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
            }),
            session: None,
        };
        assert!(response.into_session().unwrap().is_none());
    }

    #[test]
    fn parse_api_error_prefers_message_fields() {
        let rendered = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(rendered, "Invalid login credentials (400)");
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[tokio::test]
    async fn sign_in_persists_session() {
        let url = spawn_one_shot_server(
            "200 OK",
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user":{"id":"u1","email":"ada@example.com"}}"#,
        )
        .await;
        let store = MemoryStore::default();
        let client = SupabaseAuthClient::new(&url, "anon", store.clone()).unwrap();

        let session = client.sign_in("ada@example.com", "Passw0rd!").await.unwrap();

        assert_eq!(session.user.id, "u1");
        assert_eq!(store.load_session().unwrap(), Some(session));
    }

    #[tokio::test]
    async fn sign_in_maps_bad_request_to_rejection() {
        let url = spawn_one_shot_server(
            "400 Bad Request",
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .await;
        let client = SupabaseAuthClient::new(&url, "anon", MemoryStore::default()).unwrap();

        let error = client
            .sign_in("ada@example.com", "Passw0rd!")
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn sign_in_maps_server_fault_to_api_error() {
        let url = spawn_one_shot_server("503 Service Unavailable", "").await;
        let client = SupabaseAuthClient::new(&url, "anon", MemoryStore::default()).unwrap();

        let error = client
            .sign_in("ada@example.com", "Passw0rd!")
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::Api(_)));
    }

    #[tokio::test]
    async fn get_session_returns_unexpired_stored_session_without_network() {
        let store = MemoryStore::default();
        let session = crate::auth::testing::session_for("ada@example.com");
        store.save_session(&session).unwrap();
        let client =
            SupabaseAuthClient::new("http://127.0.0.1:9", "anon", store).unwrap();

        assert_eq!(client.get_session().await.unwrap(), Some(session));
    }
}
