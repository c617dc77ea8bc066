//! PostgREST-backed datastore
//!
//! Talks to a Supabase / PostgREST endpoint: filters become query-string
//! operators (`eq.`, `neq.`, `in.(…)`, `is.null`), upserts use
//! `Prefer: resolution=merge-duplicates` with an `on_conflict` parameter,
//! and every mutating call asks for `return=representation` so stored rows
//! come back to the caller.

use std::time::Duration;

use async_trait::async_trait;
use dayside_common::config::BackendConfig;
use dayside_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue};

use super::{Datastore, Filter, FilterOp, Page, Row};

const USER_AGENT: &str = concat!("dayside/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgREST client implementing the `Datastore` capability.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl RestStore {
    /// Build a store from resolved backend configuration. The API key
    /// doubles as the bearer token until `with_bearer` swaps in a user JWT.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.store_url.trim_end_matches('/').to_string(),
            api_key: config.store_key.clone(),
            bearer: config.store_key.clone(),
        })
    }

    /// Use `token` (a user JWT) for the Authorization header. Row-level
    /// security in the remote database keys off this token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = token.into();
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn headers(&self, prefer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut insert = |name: &'static str, value: &str| -> Result<()> {
            headers.insert(
                name,
                HeaderValue::from_str(value)
                    .map_err(|e| Error::Config(format!("invalid header value for {name}: {e}")))?,
            );
            Ok(())
        };
        insert("apikey", &self.api_key)?;
        insert("Authorization", &format!("Bearer {}", self.bearer))?;
        if let Some(prefer) = prefer {
            insert("Prefer", prefer)?;
        }
        Ok(headers)
    }

    async fn read_rows(response: reqwest::Response) -> Result<Vec<Row>> {
        let response = check_status(response).await?;
        let rows: Vec<Row> = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("invalid response body: {e}")))?;
        Ok(rows)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();
    let details = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str(&body).ok());
    Err(Error::api(status.as_u16(), message, details))
}

/// Render a JSON value as a PostgREST operator operand.
fn operand(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a JSON value for use inside an `in.(…)` list, where strings must
/// be quoted to protect embedded commas.
fn list_operand(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Encode a filter and page into PostgREST query parameters.
fn query_params(filter: &Filter, page: Page) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filter
        .clauses()
        .iter()
        .map(|(column, op)| {
            let expr = match op {
                FilterOp::Eq(v) => format!("eq.{}", operand(v)),
                FilterOp::Neq(v) => format!("neq.{}", operand(v)),
                FilterOp::In(values) => {
                    let list: Vec<String> = values.iter().map(list_operand).collect();
                    format!("in.({})", list.join(","))
                }
                FilterOp::IsNull => "is.null".to_string(),
                FilterOp::NotNull => "not.is.null".to_string(),
            };
            (column.clone(), expr)
        })
        .collect();

    if let Some(limit) = page.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = page.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

#[async_trait]
impl Datastore for RestStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>> {
        let mut params = query_params(filter, page);
        if !columns.is_empty() {
            params.push(("select".to_string(), columns.join(",")));
        }
        tracing::debug!(table, clauses = filter.clauses().len(), "select");

        let response = self
            .http
            .get(self.table_url(table))
            .headers(self.headers(None)?)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::read_rows(response).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        tracing::debug!(table, count = rows.len(), "insert");
        let response = self
            .http
            .post(self.table_url(table))
            .headers(self.headers(Some("return=representation"))?)
            .json(&rows)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::read_rows(response).await
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Vec<Row>> {
        tracing::debug!(table, clauses = filter.clauses().len(), "update");
        let response = self
            .http
            .patch(self.table_url(table))
            .headers(self.headers(Some("return=representation"))?)
            .query(&query_params(filter, Page::all()))
            .json(&patch)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::read_rows(response).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        conflict_columns: &[&str],
    ) -> Result<Vec<Row>> {
        tracing::debug!(table, count = rows.len(), "upsert");
        let response = self
            .http
            .post(self.table_url(table))
            .headers(self.headers(Some("return=representation,resolution=merge-duplicates"))?)
            .query(&[("on_conflict", conflict_columns.join(","))])
            .json(&rows)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::read_rows(response).await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64> {
        tracing::debug!(table, clauses = filter.clauses().len(), "delete");
        let response = self
            .http
            .delete(self.table_url(table))
            .headers(self.headers(Some("return=representation"))?)
            .query(&query_params(filter, Page::all()))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let rows = Self::read_rows(response).await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_clauses_encode_as_postgrest_operators() {
        let filter = Filter::new()
            .eq("auth_id", json!("abc"))
            .neq("status", json!("archived"))
            .not_null("organization_id");
        let params = query_params(&filter, Page::window(10, 20));

        assert_eq!(
            params,
            vec![
                ("auth_id".to_string(), "eq.abc".to_string()),
                ("status".to_string(), "neq.archived".to_string()),
                ("organization_id".to_string(), "not.is.null".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn in_list_quotes_strings() {
        let filter = Filter::new().any_of("id", [json!("a,b"), json!(7)]);
        let params = query_params(&filter, Page::all());
        assert_eq!(params[0].1, "in.(\"a,b\",7)");
    }
}
