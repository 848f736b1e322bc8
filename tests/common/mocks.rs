//! Mock services for testing
//!
//! Provides an in-memory implementation of the remote data client so the
//! data layer can be exercised without a hosted backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{json, Value};

use endpoint_admin::services::remote::{FilterOp, Filters, RemoteDataClient, SelectQuery};
use endpoint_admin::utils::{DataError, DataResult};

/// Types of errors the mock can simulate
#[derive(Debug, Clone)]
pub enum MockError {
    /// Request never reached the backend
    ConnectionRefused,
    /// Row-level security rejected the call
    PermissionDenied,
    /// Internal server error
    InternalError(String),
}

impl MockError {
    fn to_data_error(&self, target: &str) -> DataError {
        match self {
            MockError::ConnectionRefused => {
                DataError::Transport("failed to connect to backend".to_string())
            }
            MockError::PermissionDenied => DataError::Remote {
                status: 403,
                code: Some("42501".to_string()),
                message: format!("permission denied for {}", target),
            },
            MockError::InternalError(message) => DataError::remote(500, message.clone()),
        }
    }
}

type RpcHandler = Arc<dyn Fn(&Value) -> DataResult<Value> + Send + Sync>;

/// A call recorded by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub target: String,
    pub payload: Value,
}

/// In-memory remote store
#[derive(Default)]
pub struct MockRemote {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    rpc_handlers: RwLock<HashMap<String, RpcHandler>>,
    calls: RwLock<Vec<RecordedCall>>,
    /// Fail every call when set
    pub error_mode: RwLock<Option<MockError>>,
    /// Fail calls against these tables or functions only
    failing_targets: RwLock<HashSet<String>>,
}

impl MockRemote {
    /// Create a new mock remote store
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set error mode to simulate failures
    pub fn set_error_mode(&self, error: MockError) {
        *self.error_mode.write().unwrap() = Some(error);
    }

    /// Clear error mode
    pub fn clear_error_mode(&self) {
        *self.error_mode.write().unwrap() = None;
    }

    /// Fail every call against one table or function
    pub fn fail_target(&self, target: &str) {
        self.failing_targets
            .write()
            .unwrap()
            .insert(target.to_string());
    }

    /// Seed a table
    pub fn add_rows(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Answer a remote procedure with a custom handler
    pub fn on_rpc<F>(&self, function: &str, handler: F)
    where
        F: Fn(&Value) -> DataResult<Value> + Send + Sync + 'static,
    {
        self.rpc_handlers
            .write()
            .unwrap()
            .insert(function.to_string(), Arc::new(handler));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Number of calls against one table or function
    pub fn calls_to(&self, target: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|call| call.target == target)
            .count()
    }

    /// Record the call, then check if an error should be returned
    fn check(&self, operation: &'static str, target: &str, payload: Value) -> DataResult<()> {
        self.calls.write().unwrap().push(RecordedCall {
            operation,
            target: target.to_string(),
            payload,
        });

        if let Some(ref error) = *self.error_mode.read().unwrap() {
            return Err(error.to_data_error(target));
        }
        if self.failing_targets.read().unwrap().contains(target) {
            return Err(MockError::PermissionDenied.to_data_error(target));
        }
        Ok(())
    }
}

fn column<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |value, part| value.get(part))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality filters only; other operators are accepted and ignored
fn matches(row: &Value, filters: &Filters) -> bool {
    filters
        .conditions()
        .iter()
        .filter(|filter| filter.op == FilterOp::Eq)
        .all(|filter| column(row, &filter.column).map(text).as_deref() == Some(filter.value.as_str()))
}

#[async_trait]
impl RemoteDataClient for MockRemote {
    async fn select(&self, query: &SelectQuery) -> DataResult<Vec<Value>> {
        self.check("select", &query.table, json!(query.to_query_string()))?;

        let rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| matches(row, &query.filters))
            .collect();
        Ok(match query.limit {
            Some(limit) => rows.into_iter().take(limit as usize).collect(),
            None => rows,
        })
    }

    async fn insert(&self, table: &str, row: Value) -> DataResult<Vec<Value>> {
        self.check("insert", table, row.clone())?;

        let mut stored = row;
        if let Value::Object(ref mut fields) = stored {
            fields
                .entry("id")
                .or_insert_with(|| json!(uuid::Uuid::new_v4()));
            fields
                .entry("created_at")
                .or_insert_with(|| json!(chrono::Utc::now()));
        }
        self.add_rows(table, vec![stored.clone()]);
        Ok(vec![stored])
    }

    async fn update(&self, table: &str, patch: Value, filters: &Filters) -> DataResult<Vec<Value>> {
        self.check("update", table, patch.clone())?;

        let mut tables = self.tables.write().unwrap();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| matches(row, filters)) {
                if let (Value::Object(fields), Value::Object(changes)) = (&mut *row, &patch) {
                    for (key, value) in changes {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &Filters) -> DataResult<()> {
        self.check("delete", table, Value::Null)?;

        if let Some(rows) = self.tables.write().unwrap().get_mut(table) {
            rows.retain(|row| !matches(row, filters));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, params: Value) -> DataResult<Value> {
        self.check("rpc", function, params.clone())?;

        let handler = self.rpc_handlers.read().unwrap().get(function).cloned();
        match handler {
            Some(handler) => handler(&params),
            None => Ok(Value::Null),
        }
    }
}
