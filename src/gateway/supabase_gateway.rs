use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::base::{AuthGateway, ChangeListeners, SessionCallback, Subscription};
use crate::config::{AuthConfig, BackendConfig};
use crate::errors::{AuthError, ConfigError};
use crate::models::{AuthChangeEvent, AuthUser, Session, SignUpOutcome};

/// Token grant as returned by the GoTrue `/token` and `/signup` endpoints.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + chrono::Duration::seconds(self.expires_in.unwrap_or(3600)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user,
        }
    }
}

/// The error body shapes GoTrue has used over time.
#[derive(Deserialize, Default, Debug)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Map a failed GoTrue response onto the auth error taxonomy.
fn classify_error(status: StatusCode, body: &str) -> AuthError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .clone()
        .or_else(|| parsed.error.clone())
        .unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    match code.as_str() {
        "email_not_confirmed" => AuthError::EmailNotConfirmed,
        "invalid_grant" | "invalid_credentials"
            if message.to_lowercase().contains("email not confirmed") =>
        {
            AuthError::EmailNotConfirmed
        }
        "invalid_credentials" => AuthError::InvalidCredentials,
        "invalid_grant" if message.to_lowercase().contains("refresh token") => {
            AuthError::SessionExpired
        }
        "invalid_grant" => AuthError::InvalidCredentials,
        "session_expired"
        | "session_not_found"
        | "refresh_token_not_found"
        | "refresh_token_already_used" => AuthError::SessionExpired,
        _ => AuthError::Backend { status, message },
    }
}

async fn error_from_response(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_error(status, &body)
}

/// Auth gateway backed by a Supabase (GoTrue) auth endpoint.
///
/// Holds the current session in memory and, when configured, mirrors it to a
/// JSON file so the next start can restore it.
pub struct SupabaseAuthGateway {
    backend: BackendConfig,
    client: Client,
    session_file: Option<PathBuf>,
    current: Mutex<Option<Session>>,
    listeners: ChangeListeners,
}

impl SupabaseAuthGateway {
    pub fn new(backend: &BackendConfig, auth: &AuthConfig) -> Result<Self, ConfigError> {
        info!("Creating Supabase auth gateway for '{}'", backend.url);
        let client = Client::builder()
            .timeout(Duration::from_millis(auth.timeout_in_ms))
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "auth.timeout_in_ms",
                reason: e.to_string(),
            })?;
        Ok(Self {
            backend: backend.clone(),
            client,
            session_file: auth.session_file.clone(),
            current: Mutex::new(None),
            listeners: ChangeListeners::new(),
        })
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.backend.auth_url(path))
            .header("apikey", &self.backend.anon_key)
    }

    async fn grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let response = self
            .post("token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    /// Store `session` as current, persist it and tell subscribers.
    async fn apply(&self, event: AuthChangeEvent, session: Option<Session>) {
        *self.current() = session.clone();
        if let Err(e) = self.persist(session.as_ref()).await {
            warn!("Failed to persist session: {}", e);
        }
        if let Some(s) = &session {
            info!(
                event_name = event.as_str(),
                user_id = %s.user_id(),
                expires_at = %s.expires_at,
                "Session updated"
            );
        } else {
            info!(event_name = event.as_str(), "Session cleared");
        }
        self.listeners.emit(event, session.as_ref());
    }

    async fn persist(&self, session: Option<&Session>) -> Result<(), AuthError> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };
        match session {
            Some(session) => {
                let bytes = serde_json::to_vec_pretty(session)
                    .map_err(|e| AuthError::Persistence(e.to_string()))?;
                tokio::fs::write(path, bytes)
                    .await
                    .map_err(|e| AuthError::Persistence(format!("{}: {}", path.display(), e)))
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::Persistence(format!("{}: {}", path.display(), e))),
            },
        }
    }

    async fn restore(path: &Path) -> Option<Session> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read session file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl AuthGateway for SupabaseAuthGateway {
    fn get_name(&self) -> &str {
        "supabase"
    }

    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        let mut session = self.current().clone();
        if session.is_none() {
            if let Some(path) = &self.session_file {
                session = Self::restore(path).await;
                if session.is_some() {
                    debug!("Restored session from {}", path.display());
                }
                *self.current() = session.clone();
            }
        }

        match session {
            Some(s) if s.is_expired() => {
                info!(user_id = %s.user_id(), "Stored session has expired; refreshing");
                match self.refresh_session().await {
                    Ok(refreshed) => Ok(Some(refreshed)),
                    Err(AuthError::SessionExpired) => Ok(None),
                    Err(e) => Err(e),
                }
            }
            other => Ok(other),
        }
    }

    fn subscribe_to_changes(&self, callback: SessionCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        debug!("Signing in '{}'", email);
        let session = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.apply(AuthChangeEvent::SignedIn, Some(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        debug!("Signing up '{}'", email);
        let response = self
            .post("signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: Value = response.json().await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(body).map_err(|e| AuthError::Decode(e.to_string()))?;
            let session = token.into_session(Utc::now());
            self.apply(AuthChangeEvent::SignedIn, Some(session.clone()))
                .await;
            return Ok(SignUpOutcome::SignedIn(session));
        }

        // Confirmation required: the body is the new user, possibly nested under "user".
        let email = body
            .get("email")
            .or_else(|| body.get("user").and_then(|u| u.get("email")))
            .and_then(Value::as_str)
            .unwrap_or(email)
            .to_string();
        info!("Sign-up for '{}' is pending email verification", email);
        Ok(SignUpOutcome::PendingVerification { email })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.current().clone();
        let remote = match &session {
            Some(s) => {
                let result = self.post("logout").header("Authorization", s.bearer()).send().await;
                match result {
                    Ok(r) if r.status().is_success() => Ok(()),
                    // The backend already forgot this session; nothing left to revoke.
                    Ok(r)
                        if r.status() == StatusCode::UNAUTHORIZED
                            || r.status() == StatusCode::NOT_FOUND =>
                    {
                        Ok(())
                    }
                    Ok(r) => Err(error_from_response(r).await),
                    Err(e) => Err(AuthError::from(e)),
                }
            }
            None => Ok(()),
        };
        if let Err(e) = &remote {
            warn!("Sign-out request failed, clearing local session anyway: {}", e);
        }
        self.apply(AuthChangeEvent::SignedOut, None).await;
        remote
    }

    async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .current()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AuthError::NotSignedIn)?;

        match self
            .grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(session) => {
                self.apply(AuthChangeEvent::TokenRefreshed, Some(session.clone()))
                    .await;
                Ok(session)
            }
            Err(AuthError::SessionExpired) => {
                warn!("Refresh token rejected; signing out");
                self.apply(AuthChangeEvent::SignedOut, None).await;
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .post("recover")
            .json(&json!({ "email": email }))
            .send()
            .await?;
        if response.status().is_success() {
            info!("Password reset requested for '{}'", email);
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
