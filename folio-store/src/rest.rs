//! PostgREST-backed [`RemoteStore`].
//!
//! Reads and writes go through the `/rest/v1/<table>` endpoints of a hosted
//! Postgres backend, authenticated with the project's API key. Queries are
//! encoded in PostgREST's filter syntax:
//!
//! | query part   | encoding                                     |
//! |--------------|----------------------------------------------|
//! | `eq` filter  | `field=eq.value`                             |
//! | ordering     | `order=a.asc,b.desc`                         |
//! | text search  | `or=(title.ilike.*term*,tags.cs.{term})`     |
//!
//! The client has no websocket transport. Change notifications are echoed
//! locally for writes made through this store; everything else is found by
//! polling.

use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeFeed, Channel, Listener};
use crate::query::{Query, Row, TextSearch};
use crate::store::RemoteStore;
use async_trait::async_trait;
use folio_types::{ChangeEvent, ChangeKind, RecordId};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for a PostgREST endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Anonymous or service API key. Sent as `apikey` and as bearer token.
    pub api_key: String,
    /// Path of the REST schema below `base_url`.
    pub schema_path: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            schema_path: "rest/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Client for a PostgREST endpoint.
pub struct RestStore {
    config: RestConfig,
    client: Client,
    feed: ChangeFeed,
}

impl RestStore {
    pub fn new(config: RestConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            feed: ChangeFeed::new(),
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.schema_path.trim_matches('/'),
            table
        )
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    fn writing(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=representation")
    }

    fn echo(&self, table: &str, kind: ChangeKind, id: Option<&str>) {
        let record_id = id.and_then(|id| RecordId::new(id).ok());
        self.feed.publish(&ChangeEvent::new(table, kind, record_id));
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let params = query_params(query);
        debug!("GET {} {:?}", table, params);
        let response = self
            .request(Method::GET, table)
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("select on {table} failed: {e}")))?;
        read_rows(response).await
    }

    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        let response = self
            .writing(Method::POST, table)
            .json(&row)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("insert into {table} failed: {e}")))?;

        let row = read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StoreError::InvalidResponse(format!("insert into {table} returned no row"))
            })?;

        let id = row.get("id").and_then(Value::as_str);
        self.echo(table, ChangeKind::Insert, id);
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> StoreResult<Row> {
        let response = self
            .writing(Method::PATCH, table)
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("update on {table} failed: {e}")))?;

        let row = read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(table, id))?;

        self.echo(table, ChangeKind::Update, Some(id));
        Ok(row)
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<bool> {
        let response = self
            .writing(Method::DELETE, table)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("delete on {table} failed: {e}")))?;

        let removed = !read_rows(response).await?.is_empty();
        if removed {
            self.echo(table, ChangeKind::Delete, Some(id));
        }
        Ok(removed)
    }

    fn subscribe(&self, table: &str, listener: Listener) -> StoreResult<Channel> {
        Ok(self.feed.listen(table, listener))
    }
}

async fn read_rows(response: Response) -> StoreResult<Vec<Row>> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        warn!("PostgREST returned {}: {}", status, message);
        return Err(StoreError::Http {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<Vec<Row>>()
        .await
        .map_err(|e| StoreError::InvalidResponse(format!("failed to parse rows: {e}")))
}

/// Encodes a [`Query`] as PostgREST query parameters.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        let value = match &filter.value {
            Value::Null => "is.null".to_string(),
            Value::String(s) => format!("eq.{s}"),
            other => format!("eq.{other}"),
        };
        params.push((filter.field.clone(), value));
    }

    if let Some(search) = query.search.as_ref().and_then(search_param) {
        params.push(("or".to_string(), search));
    }

    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.field, if o.descending { "desc" } else { "asc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }

    params
}

fn search_param(search: &TextSearch) -> Option<String> {
    // Characters with meaning inside a PostgREST logic tree are dropped.
    let term: String = search
        .term
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '{' | '}' | '*' | '"' | '\\'))
        .collect();
    if term.is_empty() {
        return None;
    }

    let text = search
        .text_fields
        .iter()
        .map(|f| format!("{f}.ilike.*{term}*"));
    let tags = search.tag_fields.iter().map(|f| format!("{f}.cs.{{{term}}}"));
    let parts: Vec<String> = text.chain(tags).collect();
    (!parts.is_empty()).then(|| format!("({})", parts.join(",")))
}
