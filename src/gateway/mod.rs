pub mod base;
pub mod supabase_gateway;

// Re-export the primary gateway items so code outside can do
// "use crate::gateway::{AuthGateway, create_gateway};"
pub use base::{AuthGateway, ChangeListeners, SessionCallback, Subscription};
pub use supabase_gateway::SupabaseAuthGateway;

use std::sync::Arc;

use crate::config::ConfigV1;
use crate::errors::ConfigError;

/// Creates the auth gateway the configuration points at.
pub fn create_gateway(config: &ConfigV1) -> Result<Arc<dyn AuthGateway>, ConfigError> {
    Ok(Arc::new(SupabaseAuthGateway::new(
        &config.backend,
        &config.auth,
    )?))
}
