//! Accessors for the activity tables. Storage and retrieval only.

use uuid::Uuid;

use super::rest::{Query, RestClient};
use crate::errors::DataAccessError;
use crate::models::{
    ExerciseLog, NewExerciseLog, NewSymptom, NewWorkout, NewWorkoutPlan, RecordId, Symptom,
    Workout, WorkoutPlan, WorkoutPlanUpdate,
};

const EXERCISE_LOGS: &str = "exercise_logs";
const WORKOUT_PLANS: &str = "workout_plans";
const WORKOUTS: &str = "workouts";
const SYMPTOMS: &str = "symptoms";

#[derive(Clone)]
pub struct ExerciseLogRepository {
    rest: RestClient,
}

impl ExerciseLogRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// The user's latest logs, newest first.
    pub async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ExerciseLog>, DataAccessError> {
        let query = Query::table(EXERCISE_LOGS)
            .eq("user_id", user_id)
            .order("created_at", false)
            .limit(limit);
        self.rest.select(&query).await
    }

    pub async fn insert(&self, log: &NewExerciseLog) -> Result<ExerciseLog, DataAccessError> {
        self.rest.insert(EXERCISE_LOGS, log).await
    }
}

#[derive(Clone)]
pub struct WorkoutPlanRepository {
    rest: RestClient,
}

impl WorkoutPlanRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WorkoutPlan>, DataAccessError> {
        let query = Query::table(WORKOUT_PLANS)
            .eq("user_id", user_id)
            .order("created_at", false);
        self.rest.select(&query).await
    }

    pub async fn get(&self, plan_id: &RecordId) -> Result<Option<WorkoutPlan>, DataAccessError> {
        self.rest
            .select_one(&Query::table(WORKOUT_PLANS).eq("id", plan_id))
            .await
    }

    pub async fn create(&self, plan: &NewWorkoutPlan) -> Result<WorkoutPlan, DataAccessError> {
        self.rest.insert(WORKOUT_PLANS, plan).await
    }

    pub async fn update(
        &self,
        plan_id: &RecordId,
        changes: &WorkoutPlanUpdate,
    ) -> Result<Option<WorkoutPlan>, DataAccessError> {
        let mut rows: Vec<WorkoutPlan> = self
            .rest
            .update(&Query::table(WORKOUT_PLANS).eq("id", plan_id), changes)
            .await?;
        Ok(rows.pop())
    }

    pub async fn delete(&self, plan_id: &RecordId) -> Result<(), DataAccessError> {
        self.rest
            .delete(&Query::table(WORKOUT_PLANS).eq("id", plan_id))
            .await
    }
}

#[derive(Clone)]
pub struct WorkoutRepository {
    rest: RestClient,
}

impl WorkoutRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn history_for_user(&self, user_id: Uuid) -> Result<Vec<Workout>, DataAccessError> {
        let query = Query::table(WORKOUTS)
            .eq("user_id", user_id)
            .order("completed_at", false);
        self.rest.select(&query).await
    }

    pub async fn insert(&self, workout: &NewWorkout) -> Result<Workout, DataAccessError> {
        self.rest.insert(WORKOUTS, workout).await
    }
}

#[derive(Clone)]
pub struct SymptomRepository {
    rest: RestClient,
}

impl SymptomRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Symptom>, DataAccessError> {
        let query = Query::table(SYMPTOMS)
            .eq("user_id", user_id)
            .order("recorded_at", false);
        self.rest.select(&query).await
    }

    pub async fn insert(&self, symptom: &NewSymptom) -> Result<Symptom, DataAccessError> {
        self.rest.insert(SYMPTOMS, symptom).await
    }
}
