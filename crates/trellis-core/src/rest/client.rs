//! PostgREST client for the hosted Supabase tables.

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use super::{DataService, Filter, Query};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::util::compact_text;

#[derive(Clone)]
pub struct RestClient {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl RestClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.supabase_anon_key.clone(),
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Act as the signed-in user instead of the anonymous role.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn set_access_token(&mut self, access_token: Option<String>) {
        self.access_token = access_token;
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
        filters.iter().map(Filter::to_query_pair).collect()
    }

    async fn send_rows(&self, request: RequestBuilder) -> Result<Vec<Value>> {
        let response = checked(request.send().await?).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row => Ok(vec![row]),
        }
    }
}

impl DataService for RestClient {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        tracing::debug!(table = %query.table, "Selecting rows");
        let request = self.authorized(
            self.client
                .get(self.table_url(&query.table))
                .query(&query.to_query_pairs()),
        );
        self.send_rows(request).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>> {
        tracing::debug!(table, "Inserting row");
        let request = self.authorized(
            self.client
                .post(self.table_url(table))
                .header("Prefer", "return=representation")
                .json(&row),
        );
        self.send_rows(request).await
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        if filters.is_empty() {
            return Err(Error::InvalidInput(format!(
                "refusing unfiltered update on {table}"
            )));
        }
        tracing::debug!(table, "Updating rows");
        let request = self.authorized(
            self.client
                .patch(self.table_url(table))
                .query(&Self::filter_pairs(filters))
                .header("Prefer", "return=representation")
                .json(&patch),
        );
        self.send_rows(request).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        if filters.is_empty() {
            return Err(Error::InvalidInput(format!(
                "refusing unfiltered delete on {table}"
            )));
        }
        tracing::debug!(table, "Deleting rows");
        let request = self.authorized(
            self.client
                .delete(self.table_url(table))
                .query(&Self::filter_pairs(filters)),
        );
        checked(request.send().await?).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    code: Option<String>,
}

async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        message: parse_postgrest_error(&body),
    })
}

fn parse_postgrest_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestError>(body) {
        if let Some(message) = payload.message {
            let mut rendered = message.trim().to_string();
            if let Some(details) = payload.details.filter(|text| !text.trim().is_empty()) {
                rendered.push_str(&format!(": {}", details.trim()));
            }
            if let Some(hint) = payload.hint.filter(|text| !text.trim().is_empty()) {
                rendered.push_str(&format!(" (hint: {})", hint.trim()));
            }
            if let Some(code) = payload.code {
                rendered.push_str(&format!(" [{code}]"));
            }
            return rendered;
        }
    }

    let compact = compact_text(body);
    if compact.is_empty() {
        "empty response body".to_string()
    } else {
        compact
    }
}
