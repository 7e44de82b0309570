use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use super::provider::AuthContext;

/// Keep the access token fresh: refresh `margin` before the current session
/// expires. A failed refresh is not retried; the task waits for the next
/// session change instead. Returns once the session store is closed.
///
/// A session this task refreshed is refreshed again at most once: if it is
/// already inside the margin, the next refresh waits for its expiry.
pub async fn keep_session_fresh(auth: AuthContext, margin: Duration) {
    let mut changes = auth.subscribe();
    let mut refreshed_token: Option<String> = None;
    loop {
        let (session, closed) = {
            let state = changes.borrow_and_update();
            (state.session().cloned(), state.is_closed())
        };
        if closed {
            return;
        }

        let Some(session) = session else {
            if changes.changed().await.is_err() {
                return;
            }
            continue;
        };

        let now = Utc::now();
        let ours = refreshed_token.as_deref() == Some(session.access_token.as_str());
        if ours && session.is_expired_at(now) {
            warn!(
                user_id = %session.user_id(),
                "Refreshed token is already expired; waiting for the next session change"
            );
            if changes.changed().await.is_err() {
                return;
            }
            continue;
        }

        let due_at = if !session.expires_within(margin, now) {
            session.expires_at - margin
        } else if ours {
            session.expires_at
        } else {
            now
        };

        let wait = (due_at - now).to_std().unwrap_or_default();
        debug!(
            user_id = %session.user_id(),
            refresh_in_secs = wait.as_secs(),
            "Scheduled token refresh"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                match auth.refresh().await {
                    Ok(refreshed) => {
                        info!(expires_at = %refreshed.expires_at, "Access token refreshed");
                        refreshed_token = Some(refreshed.access_token);
                    }
                    Err(_) => {
                        if changes.changed().await.is_err() {
                            return;
                        }
                    }
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
