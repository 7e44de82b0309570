//! Row shapes for the activity tables. Stored and returned as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Primary keys differ between tables (serial ints and text ids both exist).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExerciseLog {
    pub id: RecordId,
    pub user_id: Uuid,
    pub exercise_name: String,
    #[serde(default)]
    pub sets: Option<i32>,
    #[serde(default)]
    pub reps: Option<i32>,
    #[serde(default)]
    pub weight: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewExerciseLog {
    pub user_id: Uuid,
    pub exercise_name: String,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutPlan {
    pub id: RecordId,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub exercises: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewWorkoutPlan {
    pub user_id: Uuid,
    pub name: String,
    pub exercises: Value,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct WorkoutPlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercises: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: RecordId,
    pub user_id: Uuid,
    #[serde(default)]
    pub plan_id: Option<RecordId>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercises: Value,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub user_id: Uuid,
    pub plan_id: Option<RecordId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exercises: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Symptom {
    pub id: RecordId,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub severity: Option<i32>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewSymptom {
    pub user_id: Uuid,
    pub name: String,
    pub severity: Option<i32>,
}
