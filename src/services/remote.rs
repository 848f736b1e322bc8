//! Remote data client
//!
//! Boundary to the hosted store. Table reads, table writes and named remote
//! procedure calls go through [`RemoteDataClient`]; [`RestDataClient`] talks
//! to the PostgREST-style REST surface of the backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::utils::{DataError, DataResult};

/// Characters of an undecodable body kept in the error message
const MAX_BODY_EXCERPT: usize = 500;

/// Comparison applied by a row filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Is,
    In,
}

impl FilterOp {
    fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Is => "is",
            FilterOp::In => "in",
        }
    }
}

/// A single `column=op.value` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    fn to_pair(&self) -> (String, String) {
        (
            self.column.clone(),
            format!("{}.{}", self.op.as_str(), self.value),
        )
    }
}

/// Builder for row filters, shared by reads, updates and deletes.
///
/// Columns of embedded resources are addressed with a dot, e.g.
/// `endpoints.organization_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    conditions: Vec<Filter>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, column: &str, op: FilterOp, value: String) -> Self {
        self.conditions.push(Filter {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, FilterOp::Eq, value.to_string())
    }

    pub fn neq(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, FilterOp::Neq, value.to_string())
    }

    pub fn gt(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, FilterOp::Gt, value.to_string())
    }

    pub fn gte(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, FilterOp::Gte, value.to_string())
    }

    pub fn lt(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, FilterOp::Lt, value.to_string())
    }

    pub fn lte(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, FilterOp::Lte, value.to_string())
    }

    /// `is.null` / `is.true` / `is.false`
    pub fn is(self, column: &str, value: &str) -> Self {
        self.push(column, FilterOp::Is, value.to_string())
    }

    pub fn in_list<T: fmt::Display>(self, column: &str, values: &[T]) -> Self {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.push(column, FilterOp::In, format!("({})", joined))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Filter] {
        &self.conditions
    }

    fn to_pairs(&self) -> Vec<(String, String)> {
        self.conditions.iter().map(Filter::to_pair).collect()
    }
}

/// Table read: column list, filters, ordering and limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub filters: Filters,
    pub order: Vec<(String, bool)>,
    pub limit: Option<u32>,
}

impl SelectQuery {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Filters::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Column list, including embedded joins such as `*, endpoints!inner(hostname)`
    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn filter(mut self, apply: impl FnOnce(Filters) -> Filters) -> Self {
        self.filters = apply(self.filters);
        self
    }

    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(|f| f.eq(column, value))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filters.to_pairs());
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, ascending)| {
                    format!("{}.{}", column, if *ascending { "asc" } else { "desc" })
                })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// Encoded query string, including the leading `?`
    pub fn to_query_string(&self) -> String {
        to_query_string(&self.to_pairs())
    }
}

fn to_query_string(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let encoded = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{}", encoded)
}

/// Operations the data layer needs from the hosted store
#[async_trait]
pub trait RemoteDataClient: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> DataResult<Vec<Value>>;

    /// Insert one row and return the stored representation
    async fn insert(&self, table: &str, row: Value) -> DataResult<Vec<Value>>;

    /// Patch every row matching `filters` and return the updated rows
    async fn update(&self, table: &str, patch: Value, filters: &Filters)
        -> DataResult<Vec<Value>>;

    async fn delete(&self, table: &str, filters: &Filters) -> DataResult<()>;

    /// Call a named remote procedure
    async fn rpc(&self, function: &str, params: Value) -> DataResult<Value>;
}

/// Decode a row set into typed records
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> DataResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(DataError::from))
        .collect()
}

/// Decode the first row of a row set
pub fn decode_first<T: DeserializeOwned>(rows: Vec<Value>) -> DataResult<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| DataError::Decode("expected at least one row".to_string()))?;
    Ok(serde_json::from_value(row)?)
}

/// Error body returned by the REST surface
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// REST implementation of [`RemoteDataClient`]
#[derive(Clone)]
pub struct RestDataClient {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestDataClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        info!("Initializing backend data client for {}", config.url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn handle_response(&self, response: Response) -> DataResult<Value> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str::<Value>(&body).map_err(|e| {
                let truncated = match body.char_indices().nth(MAX_BODY_EXCERPT) {
                    Some((end, _)) => format!("{}... (truncated)", &body[..end]),
                    None => body,
                };
                DataError::Decode(format!("{}: {}", e, truncated))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(remote_error(status.as_u16(), &body))
        }
    }

    async fn handle_rows(&self, response: Response) -> DataResult<Vec<Value>> {
        match self.handle_response(response).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }
}

fn remote_error(status: u16, body: &str) -> DataError {
    match serde_json::from_str::<RemoteErrorBody>(body) {
        Ok(parsed) => {
            let mut message = parsed
                .message
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            if let Some(details) = parsed.details {
                message = format!("{} ({})", message, details);
            }
            if let Some(hint) = parsed.hint {
                debug!(hint = %hint, "Backend hint");
            }
            DataError::Remote {
                status,
                code: parsed.code,
                message,
            }
        }
        Err(_) => DataError::Remote {
            status,
            code: None,
            message: if body.is_empty() {
                format!("Request failed with status {}", status)
            } else {
                body.to_string()
            },
        },
    }
}

#[async_trait]
impl RemoteDataClient for RestDataClient {
    async fn select(&self, query: &SelectQuery) -> DataResult<Vec<Value>> {
        let url = format!(
            "{}{}",
            self.table_url(&query.table),
            query.to_query_string()
        );
        debug!(table = %query.table, "Selecting rows");

        let response = self.authorize(self.client.get(&url)).send().await?;
        self.handle_rows(response).await
    }

    async fn insert(&self, table: &str, row: Value) -> DataResult<Vec<Value>> {
        debug!(table = %table, "Inserting row");

        let response = self
            .authorize(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        self.handle_rows(response).await
    }

    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &Filters,
    ) -> DataResult<Vec<Value>> {
        if filters.is_empty() {
            return Err(DataError::Validation(
                "refusing to update without filters".to_string(),
            ));
        }
        let url = format!(
            "{}{}",
            self.table_url(table),
            to_query_string(&filters.to_pairs())
        );
        debug!(table = %table, "Updating rows");

        let response = self
            .authorize(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        self.handle_rows(response).await
    }

    async fn delete(&self, table: &str, filters: &Filters) -> DataResult<()> {
        if filters.is_empty() {
            return Err(DataError::Validation(
                "refusing to delete without filters".to_string(),
            ));
        }
        let url = format!(
            "{}{}",
            self.table_url(table),
            to_query_string(&filters.to_pairs())
        );
        debug!(table = %table, "Deleting rows");

        let response = self
            .authorize(self.client.delete(&url))
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        self.handle_response(response).await.map(|_| ())
    }

    async fn rpc(&self, function: &str, params: Value) -> DataResult<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        debug!(function = %function, "Calling remote procedure");

        let response = self
            .authorize(self.client.post(&url))
            .json(&params)
            .send()
            .await?;
        self.handle_response(response).await
    }
}
