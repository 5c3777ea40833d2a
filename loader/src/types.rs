//! Data model shared by the count resolver, page fetcher and orchestrator.

use std::{collections::BTreeMap, fmt};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row returned by the API.
pub type Record = Map<String, Value>;

/// Scalar value of a query filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// `true` / `false`.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Free text.
    Text(String),
}

impl FilterValue {
    /// Value as sent in a query string.
    pub fn to_query_value(&self) -> String {
        match self {
            FilterValue::Bool(value) => value.to_string(),
            FilterValue::Integer(value) => value.to_string(),
            FilterValue::Float(value) => value.to_string(),
            FilterValue::Text(value) => value.clone(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FilterValue::Bool(value) => Value::Bool(*value),
            FilterValue::Integer(value) => Value::from(*value),
            FilterValue::Float(value) => Value::from(*value),
            FilterValue::Text(value) => Value::String(value.clone()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

const BASE_ID_PARAM: &str = "baseId";

/// Identifies one logical bulk query: endpoint, tenant and filters.
///
/// Filters live in a `BTreeMap`, so two descriptors built with the same
/// filters in a different order are equal and share a cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    endpoint: String,
    base_id: i64,
    filters: BTreeMap<String, FilterValue>,
}

impl RequestDescriptor {
    /// Descriptor for `endpoint` scoped to tenant `base_id`, with no filters.
    pub fn new(endpoint: impl Into<String>, base_id: i64) -> Self {
        Self {
            endpoint: endpoint.into(),
            base_id,
            filters: BTreeMap::new(),
        }
    }

    /// Add one filter. A later value for the same key replaces the earlier one.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Add every filter from `filters`.
    pub fn with_filters<K, V>(mut self, filters: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.filters
            .extend(filters.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// Collection endpoint, relative to the API root.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Tenant identifier sent as `baseId`.
    pub fn base_id(&self) -> i64 {
        self.base_id
    }

    /// Filters in key order.
    pub fn filters(&self) -> &BTreeMap<String, FilterValue> {
        &self.filters
    }

    /// `baseId` followed by every filter, in key order.
    ///
    /// A filter named `baseId` never overrides the tenant and is not sent.
    pub fn base_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(self.filters.len() + 1);
        query.push((BASE_ID_PARAM.to_string(), self.base_id.to_string()));
        query.extend(
            self.filters
                .iter()
                .filter(|(key, _)| key.as_str() != BASE_ID_PARAM)
                .map(|(key, value)| (key.clone(), value.to_query_value())),
        );
        query
    }

    /// Deterministic JSON serialization of the structural fields.
    pub fn canonical_json(&self) -> String {
        let filters = self
            .filters
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect::<Map<String, Value>>();
        let mut root = Map::new();
        root.insert("baseId".to_string(), Value::from(self.base_id));
        root.insert("endpoint".to_string(), Value::String(self.endpoint.clone()));
        root.insert("filters".to_string(), Value::Object(filters));
        Value::Object(root).to_string()
    }
}

/// Position of one page inside a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDescriptor {
    /// 1-based page number.
    pub page_number: u64,
    /// Rows per page, fixed for the whole operation.
    pub page_size: u32,
}

impl PageDescriptor {
    /// Page `page_number` (1-based) of `page_size` rows.
    pub fn new(page_number: u64, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Legacy `offset` parameter.
    pub fn offset(&self) -> u64 {
        self.page_number.saturating_sub(1) * u64::from(self.page_size)
    }
}

/// Opaque marker asking the API for one consistent view across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMarker(String);

impl SnapshotMarker {
    /// Marker for the current instant, RFC 3339 in UTC with milliseconds.
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Marker as sent in `_snapshot`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SnapshotMarker {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SnapshotMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortOrder {
    /// Value sent in `sort_order`.
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sort key and direction used for every page of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Column sent in `sort_by`.
    pub sort_by: String,
    /// Direction sent in `sort_order`.
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            sort_by: "id".to_string(),
            order: SortOrder::Asc,
        }
    }
}

/// Privilege level of whoever drives the load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallerRole {
    /// Administrators may request larger pages.
    Admin,
    /// Everyone else.
    #[default]
    Standard,
}

/// Default page size per caller role. Injected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizePolicy {
    /// Page size for [`CallerRole::Admin`].
    pub admin: u32,
    /// Page size for [`CallerRole::Standard`].
    pub standard: u32,
}

impl Default for PageSizePolicy {
    fn default() -> Self {
        Self {
            admin: 20_000,
            standard: 5_000,
        }
    }
}

impl PageSizePolicy {
    /// Page size used when the caller does not pass one explicitly.
    pub fn page_size_for(&self, role: CallerRole) -> u32 {
        match role {
            CallerRole::Admin => self.admin,
            CallerRole::Standard => self.standard,
        }
    }
}

/// Output of a successful bulk load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkResult {
    /// Every row, in server order.
    pub rows: Vec<Record>,
    /// Number of rows; always equal to `rows.len()`.
    pub total_count: u64,
    /// Wall time of the whole operation.
    pub elapsed_ms: u64,
    /// Number of page requests issued.
    pub page_count: u64,
}

impl BulkResult {
    /// Result for a collection with no rows.
    pub fn empty(elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms,
            ..Self::default()
        }
    }
}
