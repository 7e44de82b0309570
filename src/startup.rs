//! Client startup and the main navigation loop.
//!
//! Mounts the auth provider against the configured backend, resolves the
//! requested location and keeps it resolved as the session changes.

use std::sync::Arc;

use futures::future::join;
use tracing::{error, info, warn};

use crate::auth::{keep_session_fresh, AuthProvider};
use crate::config::ConfigV1;
use crate::errors::{ConfigError, NavigationError};
use crate::gateway::create_gateway;
use crate::guards::{Navigator, Resolution, RouteTable};
use crate::repository::or_empty;
use crate::session::SessionStore;
use crate::state::AppState;

const RECENT_EXERCISE_LOGS: usize = 5;

/// Runs the client until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the gateway or repositories cannot be built from the
/// configuration, or if waiting for Ctrl-C fails.
pub async fn run(
    config: Arc<ConfigV1>,
    initial_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SessionStore::new());
    let gateway = create_gateway(&config)?;
    let provider = AuthProvider::mount(gateway, store);
    let state = AppState::new(config.clone(), provider.context())?;

    let resolved = state.auth.wait_until_resolved().await;
    info!(
        signed_in = resolved.session().is_some(),
        "Starting at '{}'", initial_path
    );

    let margin = config
        .auth
        .refresh_margin()
        .ok_or_else(|| ConfigError::Invalid {
            key: "auth.refresh_margin_secs",
            reason: format!("{} is out of range", config.auth.refresh_margin_secs),
        })?;
    let refresher = tokio::spawn(keep_session_fresh(state.auth.clone(), margin));

    let mut navigator = Navigator::new(
        state.auth.clone(),
        state.profiles.clone(),
        RouteTable::formcoach(),
    );
    report(&state, navigator.navigate(initial_path).await).await;

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break signal;
            }
            next = navigator.changed() => match next {
                Some(resolution) => report(&state, resolution).await,
                None => break Ok(()),
            }
        }
    };

    refresher.abort();
    provider.unmount();
    outcome?;
    Ok(())
}

async fn report(state: &AppState, resolution: Result<Resolution, NavigationError>) {
    match resolution {
        Ok(Resolution::Render {
            route,
            path,
            params,
        }) => {
            info!(route, path = %path, params = ?params, "Rendering");
            if route == "home" {
                show_recent_activity(state).await;
            }
        }
        Ok(Resolution::Pending { path }) => info!(path = %path, "Waiting for the session"),
        Ok(Resolution::NotFound { path }) => warn!(path = %path, "Page not found"),
        Err(e) => error!("Navigation failed: {}", e),
    }
}

async fn show_recent_activity(state: &AppState) {
    let Some(session) = state.auth.session() else {
        return;
    };
    let user_id = session.user_id();
    let (logs, plans) = join(
        state
            .exercise_logs
            .recent_for_user(user_id, RECENT_EXERCISE_LOGS),
        state.workout_plans.list_for_user(user_id),
    )
    .await;
    let logs = or_empty(logs, "exercise logs");
    let plans = or_empty(plans, "workout plans");
    info!(
        user_id = %user_id,
        exercise_logs = logs.len(),
        workout_plans = plans.len(),
        "Loaded recent activity"
    );
}
