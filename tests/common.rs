#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use formcoach::auth::{AuthContext, AuthProvider};
use formcoach::errors::{AuthError, DataAccessError};
use formcoach::gateway::{AuthGateway, ChangeListeners, SessionCallback, Subscription};
use formcoach::models::{
    AuthChangeEvent, AuthUser, Profile, ProfileInsert, ProfileUpdate, Session, SignUpOutcome,
};
use formcoach::repository::ProfileRepository;
use formcoach::session::SessionStore;
use reqwest::StatusCode;
use tokio::sync::oneshot;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse";

pub fn session_for(user_id: Uuid, expires_in: Duration) -> Session {
    Session {
        access_token: format!("access-{}", Uuid::new_v4()),
        refresh_token: format!("refresh-{}", Uuid::new_v4()),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + expires_in,
        user: AuthUser {
            id: user_id,
            email: Some("athlete@example.com".to_string()),
            email_confirmed_at: Some(Utc::now()),
        },
    }
}

/// In-memory gateway. Emits change events synchronously, like the real one.
pub struct FakeGateway {
    pub user_id: Uuid,
    listeners: ChangeListeners,
    current: Mutex<Option<Session>>,
    initial: Mutex<Option<oneshot::Receiver<Option<Session>>>>,
    fail_initial: AtomicBool,
    fail_sign_out: AtomicBool,
    fail_password_reset: AtomicBool,
    refreshes: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeGateway {
            user_id: Uuid::new_v4(),
            listeners: ChangeListeners::new(),
            current: Mutex::new(None),
            initial: Mutex::new(None),
            fail_initial: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            fail_password_reset: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        })
    }

    /// A gateway that already holds a session for its user.
    pub fn signed_in() -> Arc<Self> {
        let gateway = Self::new();
        *gateway.current.lock().unwrap() = Some(session_for(gateway.user_id, Duration::hours(1)));
        gateway
    }

    /// A gateway whose startup lookup blocks until the returned sender fires.
    pub fn with_delayed_initial() -> (Arc<Self>, oneshot::Sender<Option<Session>>) {
        let gateway = Self::new();
        let (tx, rx) = oneshot::channel();
        *gateway.initial.lock().unwrap() = Some(rx);
        (gateway, tx)
    }

    /// Make the startup lookup fail.
    pub fn fail_initial_lookup(&self) {
        self.fail_initial.store(true, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self) {
        self.fail_sign_out.store(true, Ordering::SeqCst);
    }

    pub fn fail_password_reset(&self) {
        self.fail_password_reset.store(true, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Change the held session and tell subscribers.
    pub fn push(&self, event: AuthChangeEvent, session: Option<Session>) {
        *self.current.lock().unwrap() = session.clone();
        self.listeners.emit(event, session.as_ref());
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    fn get_name(&self) -> &str {
        "fake"
    }

    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        if self.fail_initial.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection refused".to_string()));
        }
        let initial = self.initial.lock().unwrap().take();
        match initial {
            Some(rx) => Ok(rx.await.unwrap_or(None)),
            None => Ok(self.current()),
        }
    }

    fn subscribe_to_changes(&self, callback: SessionCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }

    async fn sign_in(&self, _email: &str, password: &str) -> Result<Session, AuthError> {
        if password != PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        let session = session_for(self.user_id, Duration::hours(1));
        self.push(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
        Ok(SignUpOutcome::PendingVerification {
            email: email.to_string(),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.push(AuthChangeEvent::SignedOut, None);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Backend {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "auth service unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Session, AuthError> {
        let Some(current) = self.current() else {
            return Err(AuthError::NotSignedIn);
        };
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let refreshed = session_for(current.user_id(), Duration::hours(1));
        self.push(AuthChangeEvent::TokenRefreshed, Some(refreshed.clone()));
        Ok(refreshed)
    }

    async fn reset_password_for_email(&self, _email: &str) -> Result<(), AuthError> {
        if self.fail_password_reset.load(Ordering::SeqCst) {
            return Err(AuthError::Backend {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: "email rate limit exceeded".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory `profiles` table.
#[derive(Default)]
pub struct FakeProfiles {
    rows: Mutex<HashMap<Uuid, Profile>>,
    fail: AtomicBool,
    lookups: AtomicUsize,
}

impl FakeProfiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, profile: Profile) {
        self.rows.lock().unwrap().insert(profile.id, profile);
    }

    /// Make every call fail with a backend error.
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), DataAccessError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DataAccessError::Backend {
                table: "profiles".to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "boom".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for FakeProfiles {
    async fn get_all_profiles(&self) -> Result<Vec<Profile>, DataAccessError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DataAccessError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.rows.lock().unwrap().get(&user_id).cloned())
    }

    async fn create_profile(&self, profile: &ProfileInsert) -> Result<Profile, DataAccessError> {
        self.check()?;
        let mut row = Profile::new(profile.id);
        row.username = profile.username.clone();
        row.full_name = profile.full_name.clone();
        row.avatar_url = profile.avatar_url.clone();
        self.put(row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        updates: &ProfileUpdate,
    ) -> Result<Option<Profile>, DataAccessError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(username) = &updates.username {
            row.username = Some(username.clone());
        }
        if let Some(full_name) = &updates.full_name {
            row.full_name = Some(full_name.clone());
        }
        if let Some(avatar_url) = &updates.avatar_url {
            row.avatar_url = Some(avatar_url.clone());
        }
        Ok(Some(row.clone()))
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), DataAccessError> {
        self.check()?;
        self.rows.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

/// Mount a provider on `gateway` and wait for the startup lookup to finish.
pub async fn mount_resolved(gateway: Arc<FakeGateway>) -> (AuthProvider, AuthContext) {
    let provider = AuthProvider::mount(gateway, Arc::new(SessionStore::new()));
    let context = provider.context();
    context.wait_until_resolved().await;
    (provider, context)
}
