use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the hosted backend lives and how to identify to it.
///
/// Both values normally come from `SUPABASE_URL` / `SUPABASE_ANON_KEY`.
#[derive(Deserialize, Serialize, Clone, Default, JsonSchema)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

impl BackendConfig {
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url.trim_end_matches('/'), path)
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }
}

// Keep the anon key out of debug output.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

/// Settings for the auth gateway.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct AuthConfig {
    /// Per-request timeout for auth and data calls.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    /// Persist the session here so the next start can restore it.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Refresh the access token this many seconds before it expires.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: i64,
}

/// Largest accepted `refresh_margin_secs`: one day.
pub const MAX_REFRESH_MARGIN_SECS: i64 = 86_400;

impl AuthConfig {
    /// The refresh margin, or `None` when it is negative or above
    /// [`MAX_REFRESH_MARGIN_SECS`].
    pub fn refresh_margin(&self) -> Option<chrono::Duration> {
        if !(0..=MAX_REFRESH_MARGIN_SECS).contains(&self.refresh_margin_secs) {
            return None;
        }
        chrono::Duration::try_seconds(self.refresh_margin_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            timeout_in_ms: default_timeout_in_ms(),
            session_file: None,
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

fn default_refresh_margin_secs() -> i64 {
    60
}
