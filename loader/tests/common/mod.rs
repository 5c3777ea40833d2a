//! In-memory API used by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::{collections::HashMap, sync::Mutex};

use ari_bulk_loader::{ApiTransport, Record, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

/// One request seen by [`FakeApi`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub query: HashMap<String, String>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> &str {
        self.query.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn is_count(&self) -> bool {
        self.path.ends_with("/count")
    }
}

/// Serves a fixed dataset through the count and page endpoints.
pub struct FakeApi {
    rows: Vec<Record>,
    reported_count: Option<u64>,
    fail_on_page: Option<u64>,
    stall_on_page: Option<u64>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeApi {
    pub fn with_rows(count: u64) -> Self {
        Self::with_ids((1..=count).collect())
    }

    /// Serve rows with these ids, in exactly this order.
    pub fn with_ids(ids: Vec<u64>) -> Self {
        Self {
            rows: ids.into_iter().map(record).collect(),
            reported_count: None,
            fail_on_page: None,
            stall_on_page: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report `count` from the count endpoint regardless of the dataset.
    pub fn reporting_count(mut self, count: u64) -> Self {
        self.reported_count = Some(count);
        self
    }

    /// Answer HTTP 503 for page `page`.
    pub fn failing_on_page(mut self, page: u64) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    /// Never answer the request for page `page`.
    pub fn stalling_on_page(mut self, page: u64) -> Self {
        self.stall_on_page = Some(page);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn page_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|call| !call.is_count()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl ApiTransport for FakeApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Bytes, TransportError> {
        let call = RecordedCall {
            path: path.to_string(),
            query: query.iter().cloned().collect(),
        };
        self.calls.lock().expect("calls lock").push(call.clone());

        let body = if call.is_count() {
            let count = self.reported_count.unwrap_or(self.rows.len() as u64);
            json!({ "data": { "count": count } })
        } else {
            let page: u64 = call.param("page").parse().expect("page param");
            let per_page: usize = call.param("per_page").parse().expect("per_page param");
            if self.fail_on_page == Some(page) {
                return Err(TransportError::Status {
                    path: path.to_string(),
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
            if self.stall_on_page == Some(page) {
                std::future::pending::<()>().await;
            }
            let start = ((page - 1) as usize * per_page).min(self.rows.len());
            let end = (start + per_page).min(self.rows.len());
            let page_rows = &self.rows[start..end];
            json!({ "data": page_rows })
        };
        Ok(Bytes::from(serde_json::to_vec(&body).expect("serialize body")))
    }
}

/// Answers every request with the same body.
pub struct StaticApi {
    body: Value,
}

impl StaticApi {
    pub fn new(body: Value) -> Self {
        Self {
            body,
        }
    }
}

#[async_trait]
impl ApiTransport for StaticApi {
    async fn get(&self, _path: &str, _query: &[(String, String)]) -> Result<Bytes, TransportError> {
        Ok(Bytes::from(serde_json::to_vec(&self.body).expect("serialize body")))
    }
}

pub fn record(id: u64) -> Record {
    let mut row = Record::new();
    row.insert("id".to_string(), Value::from(id));
    row.insert("nome".to_string(), Value::String(format!("Cliente {id}")));
    row
}

pub fn ids(rows: &[Record]) -> Vec<u64> {
    rows.iter()
        .map(|row| row.get("id").and_then(Value::as_u64).expect("id"))
        .collect()
}
