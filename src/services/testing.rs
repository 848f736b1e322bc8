//! In-memory remote store for unit tests
//!
//! Rows are plain JSON values. Equality filters (including dotted columns of
//! embedded resources) and limits are honoured; ordering is left to the
//! fixture data.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::services::remote::{FilterOp, Filters, RemoteDataClient, SelectQuery};
use crate::utils::{DataError, DataResult};

type RpcHandler = Arc<dyn Fn(&Value) -> DataResult<Value> + Send + Sync>;

/// A call the data layer issued
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub target: String,
    pub payload: Value,
}

#[derive(Default)]
pub struct MockRemote {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    rpc_handlers: RwLock<HashMap<String, RpcHandler>>,
    failing: RwLock<HashSet<String>>,
    delays: RwLock<VecDeque<Duration>>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_rows(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .write()
            .unwrap()
            .insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn on_rpc<F>(&self, function: &str, handler: F)
    where
        F: Fn(&Value) -> DataResult<Value> + Send + Sync + 'static,
    {
        self.rpc_handlers
            .write()
            .unwrap()
            .insert(function.to_string(), Arc::new(handler));
    }

    /// Make every call against a table or function fail with a policy error
    pub fn fail(&self, target: &str) {
        self.failing.write().unwrap().insert(target.to_string());
    }

    pub fn recover(&self, target: &str) {
        self.failing.write().unwrap().remove(target);
    }

    /// Delay the next call by `delay`; queued delays apply in call order
    pub fn delay_next(&self, delay: Duration) {
        self.delays.write().unwrap().push_back(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn calls_to(&self, target: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.target == target)
            .collect()
    }

    async fn enter(&self, operation: &'static str, target: &str, payload: Value) -> DataResult<()> {
        self.calls.write().unwrap().push(RecordedCall {
            operation,
            target: target.to_string(),
            payload,
        });

        let delay = self.delays.write().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().unwrap().contains(target) {
            return Err(DataError::Remote {
                status: 403,
                code: Some("42501".to_string()),
                message: format!("permission denied for {}", target),
            });
        }
        Ok(())
    }
}

fn lookup<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
    column.split('.').try_fold(row, |value, part| value.get(part))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, filters: &Filters) -> bool {
    filters.conditions().iter().all(|filter| {
        let value = lookup(row, &filter.column).map(as_text);
        match filter.op {
            FilterOp::Eq => value.as_deref() == Some(filter.value.as_str()),
            FilterOp::Neq => value.as_deref() != Some(filter.value.as_str()),
            FilterOp::Is => value.as_deref().unwrap_or("null") == filter.value,
            FilterOp::In => {
                let inner = filter.value.trim_start_matches('(').trim_end_matches(')');
                value.is_some_and(|v| inner.split(',').any(|candidate| candidate == v))
            }
            _ => true,
        }
    })
}

#[async_trait]
impl RemoteDataClient for MockRemote {
    async fn select(&self, query: &SelectQuery) -> DataResult<Vec<Value>> {
        self.enter(
            "select",
            &query.table,
            json!({ "query": query.to_query_string() }),
        )
        .await?;

        let rows = self.rows(&query.table);
        let selected = rows
            .into_iter()
            .filter(|row| matches(row, &query.filters));
        Ok(match query.limit {
            Some(limit) => selected.take(limit as usize).collect(),
            None => selected.collect(),
        })
    }

    async fn insert(&self, table: &str, row: Value) -> DataResult<Vec<Value>> {
        self.enter("insert", table, row.clone()).await?;

        let mut stored = row;
        if let Value::Object(ref mut fields) = stored {
            fields
                .entry("id")
                .or_insert_with(|| json!(uuid::Uuid::new_v4()));
            fields
                .entry("created_at")
                .or_insert_with(|| json!(chrono::Utc::now()));
        }
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(vec![stored])
    }

    async fn update(&self, table: &str, patch: Value, filters: &Filters) -> DataResult<Vec<Value>> {
        self.enter("update", table, patch.clone()).await?;

        let mut tables = self.tables.write().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches(row, filters)) {
            if let (Value::Object(fields), Value::Object(changes)) = (&mut *row, &patch) {
                for (column, value) in changes {
                    fields.insert(column.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &Filters) -> DataResult<()> {
        self.enter("delete", table, Value::Null).await?;

        if let Some(rows) = self.tables.write().unwrap().get_mut(table) {
            rows.retain(|row| !matches(row, filters));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, params: Value) -> DataResult<Value> {
        self.enter("rpc", function, params.clone()).await?;

        let handler = self.rpc_handlers.read().unwrap().get(function).cloned();
        match handler {
            Some(handler) => handler(&params),
            None => Ok(Value::Null),
        }
    }
}
