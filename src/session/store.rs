use tokio::sync::watch;
use tracing::{debug, trace};

use crate::models::Session;

/// A snapshot of the store as published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    session: Option<Session>,
    loading: bool,
    revision: u64,
    closed: bool,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of change events applied so far. The initial resolution does not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Holds the current session (or none) plus the `loading` flag.
///
/// Readers take snapshots or subscribe; only the auth provider writes, through
/// the crate-private setters. Once closed, every write is dropped.
pub struct SessionStore {
    tx: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState {
            session: None,
            loading: true,
            revision: 0,
            closed: false,
        });
        SessionStore { tx }
    }

    pub fn session(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// A receiver that is notified on every write.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Wait until the first session resolution has happened (or the store was closed).
    pub async fn wait_until_resolved(&self) -> SessionState {
        let mut rx = self.tx.subscribe();
        let resolved = rx
            .wait_for(|state| !state.loading || state.closed)
            .await
            .map(|state| state.clone());
        resolved.unwrap_or_else(|_| self.snapshot())
    }

    /// Replace the current session with the payload of a change event.
    /// Returns false if the store is closed and the write was dropped.
    pub(crate) fn set_session(&self, session: Option<Session>) -> bool {
        self.tx.send_if_modified(|state| {
            if state.closed {
                trace!("Session store closed; dropping late session write");
                return false;
            }
            state.session = session;
            state.loading = false;
            state.revision += 1;
            true
        })
    }

    /// Apply the result of the startup session fetch. The fetched value is only
    /// stored if no change event has landed in the meantime, since any event is
    /// newer than the fetch. `loading` is cleared either way.
    pub(crate) fn resolve_initial(&self, session: Option<Session>) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if state.closed {
                trace!("Session store closed; dropping initial session");
                return false;
            }
            if state.revision == 0 {
                state.session = session;
                applied = true;
            } else {
                debug!(
                    revision = state.revision,
                    "Initial session superseded by a change event"
                );
            }
            let was_loading = state.loading;
            state.loading = false;
            applied || was_loading
        });
        applied
    }

    /// Tear the store down: subscribers are woken once more and later writes are ignored.
    pub(crate) fn close(&self) {
        self.tx.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.closed = true;
            true
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthUser;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn session(token: &str) -> Session {
        Session {
            access_token: token.to_string(),
            refresh_token: format!("{}-refresh", token),
            token_type: "bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: None,
                email_confirmed_at: None,
            },
        }
    }

    #[test]
    fn starts_loading_without_a_session() {
        let store = SessionStore::new();
        assert!(store.is_loading());
        assert!(store.session().is_none());
    }

    #[test]
    fn last_write_wins_for_any_event_sequence() {
        let sequences: Vec<Vec<Option<Session>>> = vec![
            vec![Some(session("a"))],
            vec![Some(session("a")), None],
            vec![None, Some(session("b")), Some(session("c"))],
            vec![Some(session("a")), None, None, Some(session("d")), None],
        ];

        for events in sequences {
            let store = SessionStore::new();
            for event in &events {
                assert!(store.set_session(event.clone()));
            }
            assert_eq!(store.session(), events.last().cloned().flatten());
            assert!(!store.is_loading());
            assert_eq!(store.snapshot().revision(), events.len() as u64);
        }
    }

    #[test]
    fn initial_resolution_does_not_override_a_newer_event() {
        let store = SessionStore::new();
        store.set_session(Some(session("from-event")));

        assert!(!store.resolve_initial(None));
        assert_eq!(
            store.session().map(|s| s.access_token),
            Some("from-event".to_string())
        );
        assert!(!store.is_loading());
    }

    #[test]
    fn initial_resolution_clears_loading() {
        let store = SessionStore::new();
        assert!(store.resolve_initial(Some(session("restored"))));
        assert!(!store.is_loading());
        assert!(store.session().is_some());
    }

    #[test]
    fn closed_store_drops_writes() {
        let store = SessionStore::new();
        store.close();
        assert!(!store.set_session(Some(session("late"))));
        assert!(!store.resolve_initial(Some(session("late"))));
        assert!(store.session().is_none());
        assert!(store.is_loading());
    }

    #[tokio::test]
    async fn subscribers_are_notified_of_writes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        store.set_session(Some(session("a")));
        rx.changed().await.unwrap();
        assert!(rx.borrow().session().is_some());
    }

    #[tokio::test]
    async fn wait_until_resolved_returns_after_first_resolution() {
        let store = std::sync::Arc::new(SessionStore::new());
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_until_resolved().await })
        };
        store.resolve_initial(None);
        let state = waiter.await.unwrap();
        assert!(!state.is_loading());
    }
}
