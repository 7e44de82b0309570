pub mod profiles;
pub mod records;
pub mod rest;

pub use profiles::{current_profile, ProfileRepository, SupabaseProfileRepository};
pub use records::{
    ExerciseLogRepository, SymptomRepository, WorkoutPlanRepository, WorkoutRepository,
};
pub use rest::{Query, RestClient};

use tracing::error;

use crate::errors::DataAccessError;

/// Recover a failed list query as an empty list, logging the failure.
pub fn or_empty<T>(result: Result<Vec<T>, DataAccessError>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        error!("Error fetching {}: {}", what, e);
        Vec::new()
    })
}
