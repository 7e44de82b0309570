pub mod provider;
pub mod refresh;

pub use provider::{AuthContext, AuthProvider};
pub use refresh::keep_session_fresh;
