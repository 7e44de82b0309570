//! Shared client state.
//!
//! Everything a screen needs to talk to the backend: configuration, the auth
//! context and the table repositories.

use std::sync::Arc;

use crate::auth::AuthContext;
use crate::config::ConfigV1;
use crate::errors::ConfigError;
use crate::repository::{
    ExerciseLogRepository, ProfileRepository, RestClient, SupabaseProfileRepository,
    SymptomRepository, WorkoutPlanRepository, WorkoutRepository,
};

/// Client state shared across screens. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Session, loading flag and auth operations.
    pub auth: AuthContext,
    pub profiles: Arc<dyn ProfileRepository>,
    pub exercise_logs: ExerciseLogRepository,
    pub workout_plans: WorkoutPlanRepository,
    pub workouts: WorkoutRepository,
    pub symptoms: SymptomRepository,
}

impl AppState {
    /// Build the repositories against the configured backend. Requests carry
    /// the access token of whatever session `auth` holds at the time.
    pub fn new(config: Arc<ConfigV1>, auth: AuthContext) -> Result<Self, ConfigError> {
        let rest = RestClient::new(&config.backend, &config.auth, auth.session_store())?;
        Ok(AppState {
            profiles: Arc::new(SupabaseProfileRepository::new(rest.clone())),
            exercise_logs: ExerciseLogRepository::new(rest.clone()),
            workout_plans: WorkoutPlanRepository::new(rest.clone()),
            workouts: WorkoutRepository::new(rest.clone()),
            symptoms: SymptomRepository::new(rest),
            config,
            auth,
        })
    }
}
