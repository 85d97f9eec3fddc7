//! PostgREST table access and database functions.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{SupabaseClient, SupabaseError};

/// A PostgREST query parameter (`column=op.value`, `limit=n`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    key: String,
    value: String,
}

impl Filter {
    /// `column = value`.
    pub fn eq(column: &str, value: impl std::fmt::Display) -> Self {
        Self {
            key: column.to_string(),
            value: format!("eq.{value}"),
        }
    }

    /// `select=columns`.
    #[must_use]
    pub fn select(columns: &str) -> Self {
        Self {
            key: "select".to_string(),
            value: columns.to_string(),
        }
    }

    /// `limit=n`.
    #[must_use]
    pub fn limit(n: usize) -> Self {
        Self {
            key: "limit".to_string(),
            value: n.to_string(),
        }
    }

    /// `on_conflict=columns`, for upserts.
    #[must_use]
    pub fn on_conflict(columns: &str) -> Self {
        Self {
            key: "on_conflict".to_string(),
            value: columns.to_string(),
        }
    }
}

impl SupabaseClient {
    fn rest_url(&self, path: &str, filters: &[Filter]) -> Result<url::Url, SupabaseError> {
        let mut url = url::Url::parse(&self.endpoint(&format!(
            "/rest/v1/{}",
            urlencoding::encode(path)
        )))
        .map_err(|e| SupabaseError::Parse(e.to_string()))?;

        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.key, &filter.value);
            }
        }
        Ok(url)
    }

    /// `GET /rest/v1/<table>` with `filters`.
    ///
    /// `access_token` selects the row-level-security context; `None` reads as
    /// this client's role (anon, or service role for
    /// [`SupabaseClient::service_role`]).
    ///
    /// # Errors
    ///
    /// Returns the PostgREST error (e.g. unknown relation) or a transport error.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        access_token: Option<&str>,
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .request(Method::GET, self.rest_url(table, filters)?, access_token)
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// Insert `rows`, merging on `on_conflict` columns when given.
    ///
    /// # Errors
    ///
    /// Returns the PostgREST error or a transport error.
    pub async fn insert<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &T,
        on_conflict: Option<&str>,
    ) -> Result<(), SupabaseError> {
        let mut filters = Vec::new();
        let mut prefer = "return=minimal".to_string();
        if let Some(columns) = on_conflict {
            filters.push(Filter::on_conflict(columns));
            prefer.push_str(",resolution=merge-duplicates");
        }

        let response = self
            .request(Method::POST, self.rest_url(table, &filters)?, None)
            .header("Prefer", prefer)
            .json(rows)
            .send()
            .await?;

        Self::read_body(response).await.map(|_| ())
    }

    /// Call a database function: `POST /rest/v1/rpc/<function>`.
    ///
    /// Returns the function's JSON result (`null` for `void` functions).
    ///
    /// # Errors
    ///
    /// Returns the PostgREST error (e.g. function not found) or a transport
    /// error.
    pub async fn rpc<T: Serialize + Sync>(
        &self,
        function: &str,
        args: &T,
    ) -> Result<Value, SupabaseError> {
        let url = url::Url::parse(&self.endpoint(&format!(
            "/rest/v1/rpc/{}",
            urlencoding::encode(function)
        )))
        .map_err(|e| SupabaseError::Parse(e.to_string()))?;

        let response = self
            .request(Method::POST, url, None)
            .json(args)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| SupabaseError::Parse(e.to_string()))
    }
}
