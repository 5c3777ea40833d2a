//! Bulk retrieval: count once, then walk every page strictly in order.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ClientConfig,
    count::resolve_count,
    error::{BulkLoadError, ConfigError, LoadResult},
    page::fetch_page,
    transport::{ApiTransport, HttpTransport},
    types::{
        BulkResult, CallerRole, PageDescriptor, PageSizePolicy, Record, RequestDescriptor,
        SnapshotMarker, SortSpec,
    },
};

const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);
const ABANDONED_LOAD: &str = "bulk load abandoned before completion";
// Cap on up-front allocation; larger results grow the vector as pages arrive.
const MAX_PREALLOCATED_ROWS: u64 = 1 << 20;

type ProgressFn<'a> = Box<dyn FnMut(u64, u64) + Send + 'a>;
type BatchFn<'a> = Box<dyn FnMut(&[Record], u64) + Send + 'a>;

/// Per-call options for [`BulkDataLoader::load_bulk_data`].
#[derive(Default)]
pub struct LoadOptions<'a> {
    page_size: Option<u32>,
    on_progress: Option<ProgressFn<'a>>,
    on_batch: Option<BatchFn<'a>>,
    cancel: CancellationToken,
}

impl<'a> LoadOptions<'a> {
    /// Options with the role default page size, no callbacks and a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the page size for this call.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Called after every page with `(rows loaded so far, total rows)`.
    pub fn on_progress(mut self, callback: impl FnMut(u64, u64) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Called after every page with that page's rows and its 1-based number.
    pub fn on_batch(mut self, callback: impl FnMut(&[Record], u64) + Send + 'a) -> Self {
        self.on_batch = Some(Box::new(callback));
        self
    }

    /// Abort the load when `cancel` fires.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    loading: bool,
    last_error: Option<String>,
}

/// Holds `loading` for the lifetime of one load. Dropped unfinished, the load
/// was abandoned by its caller and that is recorded as the last error.
struct LoadingGuard<'a> {
    state: &'a Mutex<LoaderState>,
    finished: bool,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a Mutex<LoaderState>) -> Self {
        let mut locked = state.lock();
        locked.loading = true;
        locked.last_error = None;
        drop(locked);
        Self {
            state,
            finished: false,
        }
    }

    fn fail(&mut self, message: String) {
        self.state.lock().last_error = Some(message);
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.loading = false;
        if !self.finished {
            tracing::warn!("bulk load dropped before completion");
            state.last_error = Some(ABANDONED_LOAD.to_string());
        }
    }
}

/// Sequences the count call and the page calls of a bulk load.
pub struct BulkDataLoader {
    transport: Arc<dyn ApiTransport>,
    role: CallerRole,
    policy: PageSizePolicy,
    sort: SortSpec,
    page_delay: Duration,
    state: Mutex<LoaderState>,
}

impl BulkDataLoader {
    /// Loader over `transport` for a standard caller.
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            role: CallerRole::default(),
            policy: PageSizePolicy::default(),
            sort: SortSpec::default(),
            page_delay: DEFAULT_PAGE_DELAY,
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Loader over an [`HttpTransport`] built from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport)).with_page_delay(config.page_delay))
    }

    /// Privilege level used to pick the default page size.
    pub fn with_role(mut self, role: CallerRole) -> Self {
        self.role = role;
        self
    }

    /// Default page sizes per role.
    pub fn with_page_size_policy(mut self, policy: PageSizePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sort key and direction sent with every page.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Pause between two page requests.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Page size used when a call does not pass one.
    pub fn default_page_size(&self) -> u32 {
        self.policy.page_size_for(self.role)
    }

    /// Whether a load is currently running.
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Message of the most recent failed or abandoned load, cleared when a new
    /// load starts.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Fetch every row matching `descriptor`.
    ///
    /// Pages are requested one at a time with the same snapshot marker and
    /// sort order. Any failure aborts the whole load and the rows gathered so
    /// far are dropped.
    pub async fn load_bulk_data(
        &self,
        descriptor: &RequestDescriptor,
        mut options: LoadOptions<'_>,
    ) -> LoadResult<BulkResult> {
        let mut guard = LoadingGuard::start(&self.state);
        let result = self.run(descriptor, &mut options).await;
        if let Err(err) = &result {
            tracing::error!(endpoint = descriptor.endpoint(), "bulk load failed: {err}");
            guard.fail(err.to_string());
        }
        guard.finish();
        result
    }

    async fn run(
        &self,
        descriptor: &RequestDescriptor,
        options: &mut LoadOptions<'_>,
    ) -> LoadResult<BulkResult> {
        let started = Instant::now();
        let page_size = options
            .page_size
            .unwrap_or_else(|| self.default_page_size());
        if page_size == 0 {
            return Err(BulkLoadError::InvalidPageSize);
        }

        let cancel = options.cancel.clone();
        let total = cancellable(&cancel, 0, resolve_count(self.transport.as_ref(), descriptor))
            .await??;
        if total == 0 {
            tracing::info!(endpoint = descriptor.endpoint(), "nothing to load");
            return Ok(BulkResult::empty(elapsed_ms(started)));
        }

        let page_count = total.div_ceil(u64::from(page_size));
        let snapshot = SnapshotMarker::now();
        tracing::info!(
            endpoint = descriptor.endpoint(),
            base_id = descriptor.base_id(),
            %snapshot,
            "loading {total} rows in {page_count} page(s) of {page_size}"
        );

        let mut rows: Vec<Record> = Vec::with_capacity(total.min(MAX_PREALLOCATED_ROWS) as usize);
        for page_number in 1..=page_count {
            let completed = page_number - 1;
            if cancel.is_cancelled() {
                tracing::warn!("bulk load cancelled before page {page_number}/{page_count}");
                return Err(BulkLoadError::Cancelled {
                    completed_pages: completed,
                });
            }

            let page = PageDescriptor::new(page_number, page_size);
            let batch = cancellable(
                &cancel,
                completed,
                fetch_page(self.transport.as_ref(), descriptor, page, &snapshot, &self.sort),
            )
            .await??;

            let loaded = (rows.len() + batch.len()) as u64;
            if let Some(on_progress) = options.on_progress.as_mut() {
                on_progress(loaded, total);
            }
            if let Some(on_batch) = options.on_batch.as_mut() {
                on_batch(&batch, page_number);
            }
            tracing::info!("page {page_number}/{page_count} loaded: {} rows", batch.len());
            rows.extend(batch);

            if page_number < page_count {
                cancellable(&cancel, page_number, tokio::time::sleep(self.page_delay)).await?;
            }
        }

        let received = rows.len() as u64;
        if received != total {
            return Err(BulkLoadError::CountMismatch {
                expected: total,
                received,
            });
        }

        let elapsed_ms = elapsed_ms(started);
        tracing::info!("bulk load complete: {received} rows in {elapsed_ms}ms");
        Ok(BulkResult {
            rows,
            total_count: received,
            elapsed_ms,
            page_count,
        })
    }
}

/// Run `future` unless `cancel` fires first.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    completed_pages: u64,
    future: F,
) -> LoadResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!("bulk load cancelled after {completed_pages} page(s)");
            Err(BulkLoadError::Cancelled {
                completed_pages,
            })
        },
        output = future => Ok(output),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
