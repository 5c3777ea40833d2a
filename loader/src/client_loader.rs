//! Bulk loader with a session cache in front of it.

use tokio_util::sync::CancellationToken;

use crate::{
    cache::ResultCache,
    error::LoadResult,
    orchestrator::{BulkDataLoader, LoadOptions},
    types::{FilterValue, Record, RequestDescriptor},
};

/// Endpoint listing the customers of a tenant.
pub const CLIENTS_ENDPOINT: &str = "/api/clientes";

/// Rows returned by [`BulkClientLoader::load`], and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLoad {
    /// Every row, in server order.
    pub rows: Vec<Record>,
    /// `true` when no network call was made.
    pub from_cache: bool,
    /// Wall time of the bulk load; zero for cache hits.
    pub elapsed_ms: u64,
    /// Page requests issued; zero for cache hits.
    pub page_count: u64,
}

impl CachedLoad {
    /// Number of rows.
    pub fn total_count(&self) -> usize {
        self.rows.len()
    }
}

/// Owns a [`BulkDataLoader`] and the [`ResultCache`] for its session.
///
/// The cache is mutated only through `&mut self`, so calls are sequential.
pub struct BulkClientLoader {
    loader: BulkDataLoader,
    cache: ResultCache,
}

impl BulkClientLoader {
    /// Client loader with an unbounded cache.
    pub fn new(loader: BulkDataLoader) -> Self {
        Self::with_cache(loader, ResultCache::new())
    }

    /// Client loader using `cache`.
    pub fn with_cache(loader: BulkDataLoader, cache: ResultCache) -> Self {
        Self {
            loader,
            cache,
        }
    }

    /// The wrapped loader, for its loading/error state.
    pub fn loader(&self) -> &BulkDataLoader {
        &self.loader
    }

    /// Load every customer of tenant `base_id` matching `filters`.
    pub async fn load_clients<K, V>(
        &mut self,
        base_id: i64,
        filters: impl IntoIterator<Item = (K, V)>,
        use_cache: bool,
        cancel: CancellationToken,
    ) -> LoadResult<CachedLoad>
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        let descriptor = RequestDescriptor::new(CLIENTS_ENDPOINT, base_id).with_filters(filters);
        self.load(&descriptor, use_cache, cancel).await
    }

    /// Load `descriptor`, answering from the cache when `use_cache` is set
    /// and an entry exists. Successful network loads are cached when
    /// `use_cache` is set.
    pub async fn load(
        &mut self,
        descriptor: &RequestDescriptor,
        use_cache: bool,
        cancel: CancellationToken,
    ) -> LoadResult<CachedLoad> {
        if use_cache {
            if let Some(rows) = self.cache.get(descriptor) {
                tracing::info!(
                    endpoint = descriptor.endpoint(),
                    rows = rows.len(),
                    "returning cached bulk result"
                );
                return Ok(CachedLoad {
                    rows: rows.to_vec(),
                    from_cache: true,
                    elapsed_ms: 0,
                    page_count: 0,
                });
            }
        }

        let options = LoadOptions::new()
            .cancel_token(cancel)
            .on_progress(|loaded, total| {
                let percent = loaded.saturating_mul(100) / total.max(1);
                tracing::info!("progress: {loaded}/{total} ({percent}%)");
            });
        let result = self.loader.load_bulk_data(descriptor, options).await?;

        if use_cache {
            self.cache.put(descriptor, result.rows.clone());
        }
        Ok(CachedLoad {
            rows: result.rows,
            from_cache: false,
            elapsed_ms: result.elapsed_ms,
            page_count: result.page_count,
        })
    }

    /// Drop every cached result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of cached result sets.
    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }
}
