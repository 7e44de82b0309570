use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::AuthError;
use crate::gateway::{AuthGateway, Subscription};
use crate::models::{AuthChangeEvent, Session, SignUpOutcome};
use crate::session::{SessionState, SessionStore};

/// What the rest of the client sees of authentication: the current session,
/// the loading flag, and the auth operations.
///
/// Operations go to the gateway; their effect on the session arrives through
/// the gateway's change events, which the provider funnels into the store.
#[derive(Clone)]
pub struct AuthContext {
    gateway: Arc<dyn AuthGateway>,
    store: Arc<SessionStore>,
}

impl AuthContext {
    pub fn session(&self) -> Option<Session> {
        self.store.session()
    }

    pub fn loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub async fn wait_until_resolved(&self) -> SessionState {
        self.store.wait_until_resolved().await
    }

    /// Read access to the store, e.g. for clients that need the access token.
    pub fn session_store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.gateway.sign_in(email, password).await.map_err(|e| {
            warn!("Sign-in failed for '{}': {}", email, e);
            e
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        self.gateway.sign_up(email, password).await.map_err(|e| {
            warn!("Sign-up failed for '{}': {}", email, e);
            e
        })
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.gateway.sign_out().await.map_err(|e| {
            warn!("Sign-out failed: {}", e);
            e
        })
    }

    pub async fn refresh(&self) -> Result<Session, AuthError> {
        self.gateway.refresh_session().await.map_err(|e| {
            warn!("Token refresh failed: {}", e);
            e
        })
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.gateway
            .reset_password_for_email(email)
            .await
            .map_err(|e| {
                warn!("Password reset failed for '{}': {}", email, e);
                e
            })
    }
}

/// Owns the link between an auth gateway and a session store for the
/// lifetime of the client.
///
/// Mounting subscribes to change events and starts the one-shot session fetch;
/// unmounting (or dropping) aborts the fetch, releases the subscription and
/// closes the store so nothing is written after teardown.
pub struct AuthProvider {
    context: AuthContext,
    subscription: Option<Subscription>,
    initial_fetch: Option<JoinHandle<()>>,
}

impl AuthProvider {
    /// Must be called from within a Tokio runtime.
    pub fn mount(gateway: Arc<dyn AuthGateway>, store: Arc<SessionStore>) -> Self {
        info!("Mounting auth provider on '{}' gateway", gateway.get_name());

        // Subscribe before fetching so no event between the two is lost.
        let listener_store = Arc::downgrade(&store);
        let subscription = gateway.subscribe_to_changes(Arc::new(
            move |event: AuthChangeEvent, session: Option<Session>| {
                let Some(store) = listener_store.upgrade() else {
                    return;
                };
                if store.set_session(session) {
                    debug!(event_name = event.as_str(), "Session store updated");
                } else {
                    debug!(
                        event_name = event.as_str(),
                        "Auth provider unmounted; ignoring change event"
                    );
                }
            },
        ));

        let fetch_gateway = gateway.clone();
        let fetch_store = store.clone();
        let initial_fetch = tokio::spawn(async move {
            let session = match fetch_gateway.get_current_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!("Initial session fetch failed; continuing signed out: {}", e);
                    None
                }
            };
            let signed_in = session.is_some();
            if fetch_store.resolve_initial(session) {
                info!(signed_in, "Initial session resolved");
            }
        });

        AuthProvider {
            context: AuthContext { gateway, store },
            subscription: Some(subscription),
            initial_fetch: Some(initial_fetch),
        }
    }

    pub fn context(&self) -> AuthContext {
        self.context.clone()
    }

    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(fetch) = self.initial_fetch.take() {
            fetch.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            self.context.store.close();
            info!("Auth provider unmounted");
        }
    }
}

impl Drop for AuthProvider {
    fn drop(&mut self) {
        self.teardown();
    }
}
