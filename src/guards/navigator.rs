use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::guard::{GuardInput, GuardOutcome, PendingOn, ProfileLookup, HOME};
use super::routes::RouteTable;
use crate::auth::AuthContext;
use crate::errors::NavigationError;
use crate::models::Profile;
use crate::repository::{current_profile, ProfileRepository};
use crate::session::SessionState;

/// Redirect hops allowed while resolving a single navigation.
const MAX_REDIRECTS: usize = 8;

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every guard allowed; show `route`.
    Render {
        route: &'static str,
        path: String,
        params: BTreeMap<String, String>,
    },
    /// The session is still loading; nothing to show yet.
    Pending { path: String },
    NotFound { path: String },
}

impl Resolution {
    pub fn path(&self) -> &str {
        match self {
            Resolution::Render { path, .. }
            | Resolution::Pending { path }
            | Resolution::NotFound { path } => path,
        }
    }

    pub fn route(&self) -> Option<&'static str> {
        match self {
            Resolution::Render { route, .. } => Some(route),
            _ => None,
        }
    }
}

/// Owns the current location and keeps it consistent with the session.
pub struct Navigator {
    profiles: Arc<dyn ProfileRepository>,
    routes: RouteTable,
    location: String,
    changes: watch::Receiver<SessionState>,
}

impl Navigator {
    pub fn new(auth: AuthContext, profiles: Arc<dyn ProfileRepository>, routes: RouteTable) -> Self {
        let changes = auth.subscribe();
        Navigator {
            profiles,
            routes,
            location: HOME.to_string(),
            changes,
        }
    }

    /// The last path navigated to or landed on.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Resolve `path` through its guards, following redirects, and record the
    /// resulting location. A pending resolution keeps the requested path so it
    /// is retried on the next session change.
    pub async fn navigate(&mut self, path: &str) -> Result<Resolution, NavigationError> {
        let state = self.changes.borrow_and_update().clone();
        let resolution = self.resolve(path, &state).await?;
        self.location = resolution.path().to_string();
        Ok(resolution)
    }

    /// Wait for the next session change and re-resolve the current location.
    /// Returns `None` once the auth provider has been unmounted.
    pub async fn changed(&mut self) -> Option<Result<Resolution, NavigationError>> {
        if self.changes.changed().await.is_err() || self.changes.borrow().is_closed() {
            return None;
        }
        let location = self.location.clone();
        debug!(location = %location, "Session changed; re-resolving");
        Some(self.navigate(&location).await)
    }

    async fn resolve(
        &self,
        path: &str,
        state: &SessionState,
    ) -> Result<Resolution, NavigationError> {
        let mut current = path.to_string();
        let mut visited: Vec<String> = Vec::new();
        // Fetched at most once per navigation, and only if a profile guard asks.
        let mut profile: Option<Option<Profile>> = None;

        loop {
            let Some(matched) = self.routes.resolve(&current) else {
                info!(path = %current, "No route matches");
                return Ok(Resolution::NotFound { path: current });
            };

            let input = GuardInput {
                session: state.session(),
                session_loading: state.is_loading(),
                profile: match &profile {
                    None => ProfileLookup::Loading,
                    Some(p) => p.as_ref().into(),
                },
            };

            match matched.route.guards.evaluate(&input) {
                GuardOutcome::Allow => {
                    debug!(route = matched.route.name, path = %current, "Route allowed");
                    return Ok(Resolution::Render {
                        route: matched.route.name,
                        params: matched.params,
                        path: current,
                    });
                }
                GuardOutcome::Pending(PendingOn::Session) => {
                    debug!(path = %current, "Waiting for the session to resolve");
                    return Ok(Resolution::Pending { path: current });
                }
                GuardOutcome::Pending(PendingOn::Profile) => {
                    // Same session the guards see, even if the store has moved on.
                    profile = Some(current_profile(self.profiles.as_ref(), state.session()).await);
                }
                GuardOutcome::Redirect(target) => {
                    visited.push(current);
                    if visited.len() > MAX_REDIRECTS || visited.iter().any(|p| p == target) {
                        return Err(NavigationError::RedirectLoop {
                            path: target.to_string(),
                            visited,
                        });
                    }
                    info!(
                        from = visited.last().map(String::as_str).unwrap_or_default(),
                        to = target,
                        "Redirecting"
                    );
                    current = target.to_string();
                }
            }
        }
    }
}
