use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AuthConfig, BackendConfig};
use crate::errors::{ConfigError, DataAccessError};
use crate::session::SessionStore;

/// A single-table row query: equality filters, one ordering column, a limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Query {
            table: name.to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Filters only, for writes.
    fn filter_params(&self) -> Vec<(String, String)> {
        self.filters.clone()
    }

    /// PostgREST query-string parameters for a read.
    fn select_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filter_params());
        if let Some((column, ascending)) = &self.order {
            let direction = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[derive(Deserialize, Default)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
}

/// Client for the backend's row API. Requests carry the anon key and, when a
/// user is signed in, their access token so row-level policies apply.
#[derive(Clone)]
pub struct RestClient {
    backend: BackendConfig,
    client: Client,
    session: Arc<SessionStore>,
}

impl RestClient {
    pub fn new(
        backend: &BackendConfig,
        auth: &AuthConfig,
        session: Arc<SessionStore>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(auth.timeout_in_ms))
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "auth.timeout_in_ms",
                reason: e.to_string(),
            })?;
        Ok(RestClient {
            backend: backend.clone(),
            client,
            session,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = match self.session.session() {
            Some(session) => session.bearer(),
            None => format!("Bearer {}", self.backend.anon_key),
        };
        self.client
            .request(method, self.backend.rest_url(table))
            .header("apikey", &self.backend.anon_key)
            .header("Authorization", bearer)
    }

    async fn check(table: &str, response: Response) -> Result<Response, DataAccessError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let parsed: PostgrestError = serde_json::from_str(&body).unwrap_or_default();
        let message = match (parsed.message, parsed.details) {
            (Some(m), Some(d)) => format!("{} ({})", m, d),
            (Some(m), None) => m,
            _ if !body.is_empty() => body,
            _ => status.to_string(),
        };
        Err(DataAccessError::Backend {
            table: table.to_string(),
            status,
            message,
        })
    }

    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, DataAccessError> {
        debug!(table = query.table_name(), "Selecting rows");
        let response = self
            .request(Method::GET, &query.table)
            .query(&query.select_params())
            .send()
            .await?;
        let rows = Self::check(&query.table, response).await?.json().await?;
        Ok(rows)
    }

    /// Zero or one row; more than one is an error.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, DataAccessError> {
        let mut rows: Vec<T> = self.select(query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(DataAccessError::Decode(format!(
                "expected at most one row from '{}', got {}",
                query.table, n
            ))),
        }
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B, T>(&self, table: &str, row: &B) -> Result<T, DataAccessError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(table, "Inserting row");
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<T> = Self::check(table, response).await?.json().await?;
        rows.pop()
            .ok_or_else(|| DataAccessError::Decode(format!("insert into '{}' returned no row", table)))
    }

    /// Update the rows matching `query` and return them as stored.
    pub async fn update<B, T>(&self, query: &Query, changes: &B) -> Result<Vec<T>, DataAccessError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(table = query.table_name(), "Updating rows");
        let response = self
            .request(Method::PATCH, &query.table)
            .query(&query.filter_params())
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .await?;
        let rows = Self::check(&query.table, response).await?.json().await?;
        Ok(rows)
    }

    pub async fn delete(&self, query: &Query) -> Result<(), DataAccessError> {
        debug!(table = query.table_name(), "Deleting rows");
        let response = self
            .request(Method::DELETE, &query.table)
            .query(&query.filter_params())
            .send()
            .await?;
        Self::check(&query.table, response).await?;
        Ok(())
    }
}
