//! The single current session of a running client.

pub mod store;

pub use store::{SessionState, SessionStore};
