use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use super::rest::{Query, RestClient};
use crate::errors::DataAccessError;
use crate::models::{Profile, ProfileInsert, ProfileUpdate, Session};

const PROFILES: &str = "profiles";

/// CRUD access to the `profiles` table, one row per auth user.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_all_profiles(&self) -> Result<Vec<Profile>, DataAccessError>;
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DataAccessError>;
    async fn create_profile(&self, profile: &ProfileInsert) -> Result<Profile, DataAccessError>;
    /// Returns the updated profile, or `None` if the user has no profile row.
    async fn update_profile(
        &self,
        user_id: Uuid,
        updates: &ProfileUpdate,
    ) -> Result<Option<Profile>, DataAccessError>;
    async fn delete_profile(&self, user_id: Uuid) -> Result<(), DataAccessError>;
}

pub struct SupabaseProfileRepository {
    rest: RestClient,
}

impl SupabaseProfileRepository {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl ProfileRepository for SupabaseProfileRepository {
    async fn get_all_profiles(&self) -> Result<Vec<Profile>, DataAccessError> {
        self.rest.select(&Query::table(PROFILES)).await
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DataAccessError> {
        self.rest
            .select_one(&Query::table(PROFILES).eq("id", user_id))
            .await
    }

    async fn create_profile(&self, profile: &ProfileInsert) -> Result<Profile, DataAccessError> {
        let created: Profile = self.rest.insert(PROFILES, profile).await?;
        info!(user_id = %created.id, "Created profile");
        Ok(created)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        updates: &ProfileUpdate,
    ) -> Result<Option<Profile>, DataAccessError> {
        let mut rows: Vec<Profile> = self
            .rest
            .update(&Query::table(PROFILES).eq("id", user_id), updates)
            .await?;
        Ok(rows.pop())
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), DataAccessError> {
        self.rest
            .delete(&Query::table(PROFILES).eq("id", user_id))
            .await?;
        info!(user_id = %user_id, "Deleted profile");
        Ok(())
    }
}

/// The profile of the user `session` belongs to. No session, no profile row
/// and a failed lookup all come back as `None`; the failure is logged.
pub async fn current_profile(
    profiles: &dyn ProfileRepository,
    session: Option<&Session>,
) -> Option<Profile> {
    let user_id = session?.user_id();
    match profiles.get_profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(user_id = %user_id, "Error fetching profile: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, BackendConfig};
    use crate::session::SessionStore;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    fn repository(url: String) -> SupabaseProfileRepository {
        let backend = BackendConfig {
            url,
            anon_key: "anon-key".to_string(),
        };
        let rest =
            RestClient::new(&backend, &AuthConfig::default(), Arc::new(SessionStore::new()))
                .unwrap();
        SupabaseProfileRepository::new(rest)
    }

    fn signed_in_session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            user: crate::models::AuthUser {
                id: Uuid::new_v4(),
                email: None,
                email_confirmed_at: None,
            },
        }
    }

    #[tokio::test]
    async fn get_profile_filters_by_id() {
        let id = Uuid::new_v4();
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", id)))
            .with_status(200)
            .with_body(json!([{ "id": id, "username": "jack", "role": "admin" }]).to_string())
            .create_async()
            .await;

        let profile = repository(server.url()).get_profile(id).await.unwrap();
        m.assert_async().await;
        let profile = profile.expect("profile exists");
        assert_eq!(profile.username.as_deref(), Some("jack"));
        assert!(profile.is_admin());
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let profile = repository(server.url())
            .get_profile(Uuid::new_v4())
            .await
            .unwrap();
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn create_profile_asks_for_the_stored_row() {
        let id = Uuid::new_v4();
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/rest/v1/profiles")
            .match_header("prefer", "return=representation")
            .match_body(Matcher::Json(json!({ "id": id, "username": "ginger" })))
            .with_status(201)
            .with_body(json!([{ "id": id, "username": "ginger" }]).to_string())
            .create_async()
            .await;

        let created = repository(server.url())
            .create_profile(&ProfileInsert {
                id,
                username: Some("ginger".to_string()),
                full_name: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        m.assert_async().await;
        assert_eq!(created.id, id);
    }

    #[tokio::test]
    async fn update_profile_patches_matching_row() {
        let id = Uuid::new_v4();
        let mut server = Server::new_async().await;
        let m = server
            .mock("PATCH", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", id)))
            .match_body(Matcher::Json(json!({ "full_name": "Ginger Example" })))
            .with_status(200)
            .with_body(json!([{ "id": id, "full_name": "Ginger Example" }]).to_string())
            .create_async()
            .await;

        let updated = repository(server.url())
            .update_profile(
                id,
                &ProfileUpdate {
                    full_name: Some("Ginger Example".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        m.assert_async().await;
        assert_eq!(
            updated.and_then(|p| p.full_name).as_deref(),
            Some("Ginger Example")
        );
    }

    #[tokio::test]
    async fn get_all_profiles_selects_every_row() {
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::UrlEncoded("select".into(), "*".into()))
            .with_status(200)
            .with_body(
                json!([
                    { "id": first, "username": "jack" },
                    { "id": second, "username": "ginger", "role": "admin" }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let profiles = repository(server.url()).get_all_profiles().await.unwrap();
        m.assert_async().await;
        assert_eq!(
            profiles.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![first, second]
        );
        assert!(!profiles[0].is_admin());
        assert!(profiles[1].is_admin());
    }

    #[tokio::test]
    async fn delete_profile_targets_one_row() {
        let id = Uuid::new_v4();
        let mut server = Server::new_async().await;
        let m = server
            .mock("DELETE", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", id)))
            .with_status(204)
            .create_async()
            .await;

        repository(server.url()).delete_profile(id).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn delete_profile_reports_backend_errors() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(json!({ "message": "permission denied for table profiles" }).to_string())
            .create_async()
            .await;

        let err = repository(server.url())
            .delete_profile(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, DataAccessError::Backend { ref table, .. } if table == "profiles"));
    }

    #[tokio::test]
    async fn current_profile_looks_up_the_given_session_user() {
        let session = signed_in_session();
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::UrlEncoded(
                "id".into(),
                format!("eq.{}", session.user_id()),
            ))
            .with_status(200)
            .with_body(json!([{ "id": session.user_id() }]).to_string())
            .expect(1)
            .create_async()
            .await;
        let profiles = repository(server.url());

        assert!(current_profile(&profiles, None).await.is_none());
        let profile = current_profile(&profiles, Some(&session)).await;
        m.assert_async().await;
        assert_eq!(profile.map(|p| p.id), Some(session.user_id()));
    }

    #[tokio::test]
    async fn current_profile_hides_lookup_failures() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex("^/rest/v1/profiles".to_string()))
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("{}")
            .create_async()
            .await;
        let session = signed_in_session();

        let profile = current_profile(&repository(server.url()), Some(&session)).await;
        assert!(profile.is_none());
    }
}
