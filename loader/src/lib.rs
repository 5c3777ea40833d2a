//! Bulk paginated retrieval for tenant scoped REST collections.
//!
//! A [`BulkDataLoader`] asks the API for the number of matching rows, then
//! walks the collection page by page with a fixed sort order and a shared
//! snapshot marker, reporting progress as it goes. [`BulkClientLoader`] puts a
//! session scoped [`ResultCache`] in front of it.
//!
//! The HTTP client is injected through [`ApiTransport`]; [`HttpTransport`] is
//! the `reqwest` implementation configured by [`ClientConfig`].

pub mod cache;
pub mod client_loader;
pub mod config;
pub mod count;
pub mod error;
pub mod orchestrator;
pub mod page;
pub mod transport;
pub mod types;

pub use cache::{CacheKey, ResultCache};
pub use client_loader::{BulkClientLoader, CachedLoad, CLIENTS_ENDPOINT};
pub use config::{ApiEnvironment, ClientConfig, Credentials};
pub use error::{BulkLoadError, ConfigError, LoadResult, SchemaError, TransportError};
pub use orchestrator::{BulkDataLoader, LoadOptions};
pub use tokio_util::sync::CancellationToken;
pub use transport::{ApiTransport, HttpTransport};
pub use types::{
    BulkResult, CallerRole, FilterValue, PageDescriptor, PageSizePolicy, Record,
    RequestDescriptor, SnapshotMarker, SortOrder, SortSpec,
};
