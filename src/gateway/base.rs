use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::errors::AuthError;
use crate::models::{AuthChangeEvent, Session, SignUpOutcome};

/// Called for every session change, in the order the changes happen.
pub type SessionCallback = Arc<dyn Fn(AuthChangeEvent, Option<Session>) + Send + Sync>;

/// The auth gateway is the only thing that talks to the backend auth service.
///
/// Implementations must emit a change event to every subscriber whenever the
/// session they hold changes (sign-in, sign-out, refresh), after the change has
/// been applied. They never retry.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    fn get_name(&self) -> &str;

    /// One-shot lookup of the session the gateway currently holds, used at startup.
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Register `callback` for change events; dispose of the returned handle to stop.
    fn subscribe_to_changes(&self, callback: SessionCallback) -> Subscription;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// Ends the session. The local session is gone afterwards even if the
    /// backend call failed; that failure is still returned.
    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn refresh_session(&self) -> Result<Session, AuthError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError>;
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: Vec<(u64, SessionCallback)>,
}

/// Registration-ordered set of change callbacks, shared by gateway implementations.
#[derive(Clone, Default)]
pub struct ChangeListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl ChangeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ListenerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, callback: SessionCallback) -> Subscription {
        let mut table = self.lock();
        table.next_id += 1;
        let id = table.next_id;
        table.listeners.push((id, callback));
        trace!(subscription_id = id, "Registered session listener");
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Deliver `event` to every current listener. Callbacks run outside the
    /// lock so they may subscribe or unsubscribe themselves.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let callbacks: Vec<SessionCallback> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        debug!(
            event_name = event.as_str(),
            listeners = callbacks.len(),
            "Emitting auth change event"
        );
        for callback in callbacks {
            callback(event, session.cloned());
        }
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Disposal handle for a change subscription. Released exactly once, either by
/// [`Subscription::unsubscribe`] or on drop.
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let table = std::mem::take(&mut self.table);
        if let Some(table) = table.upgrade() {
            let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
            table.listeners.retain(|(id, _)| *id != self.id);
            trace!(subscription_id = self.id, "Released session listener");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
