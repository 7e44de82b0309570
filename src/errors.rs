//! Error taxonomy shared by the configuration, auth and data-access layers.

use reqwest::StatusCode;
use thiserror::Error;

/// Fatal startup errors: the client cannot run without a backend to talk to.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value '{0}' (set it in config.yaml or the environment)")]
    Missing(&'static str),

    #[error("invalid configuration value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("error loading configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// Failures reported by the auth gateway. Recovered by the caller and shown
/// as a form-level message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email address has not been confirmed")]
    EmailNotConfirmed,

    #[error("session has expired")]
    SessionExpired,

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("auth backend returned {status}: {message}")]
    Backend { status: StatusCode, message: String },

    #[error("error sending auth request: {0}")]
    Network(String),

    #[error("error decoding auth response: {0}")]
    Decode(String),

    #[error("error persisting session: {0}")]
    Persistence(String),
}

impl AuthError {
    /// The text a login/signup form shows for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password.".to_string(),
            AuthError::EmailNotConfirmed => {
                "Please verify your email address before signing in.".to_string()
            }
            AuthError::SessionExpired | AuthError::NotSignedIn => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::Backend { message, .. } => message.clone(),
            AuthError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            AuthError::Decode(_) | AuthError::Persistence(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AuthError::Decode(e.to_string())
        } else {
            AuthError::Network(e.to_string())
        }
    }
}

/// Failures of a row query against the backend.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("backend returned {status} for '{table}': {message}")]
    Backend {
        table: String,
        status: StatusCode,
        message: String,
    },

    #[error("error sending query: {0}")]
    Network(String),

    #[error("error decoding rows: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DataAccessError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DataAccessError::Decode(e.to_string())
        } else {
            DataAccessError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("redirect loop while resolving '{path}' (visited: {visited:?})")]
    RedirectLoop { path: String, visited: Vec<String> },
}
