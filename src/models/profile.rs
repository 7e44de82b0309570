use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Feature flag that unlocks the FormCoach trends screens.
pub const FORMCOACH_FEATURE: &str = "formcoach";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

/// A row of the `profiles` table. `id` is the auth user id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: ProfileRole,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature_access: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(id: Uuid) -> Self {
        Profile {
            id,
            username: None,
            full_name: None,
            avatar_url: None,
            role: ProfileRole::User,
            feature_access: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ProfileRole::Admin
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.feature_access.iter().any(|f| f == feature)
    }
}

/// Payload for creating a profile during profile setup.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProfileInsert {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Partial update; unset fields are left untouched by the backend.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
