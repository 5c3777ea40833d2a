use std::path::Path;

use anyhow::{Context, Result};
use ari_bulk_loader::{
    BulkDataLoader, CancellationToken, ClientConfig, LoadOptions, RequestDescriptor,
};
use serde::Serialize;

use crate::{
    cli::{OutputFormat, QueryArgs, Role},
    utils::{parse_filters, print_json, write_rows},
};

#[derive(Serialize)]
struct LoadSummary<'a> {
    endpoint: &'a str,
    base_id: i64,
    total_count: u64,
    page_count: u64,
    elapsed_ms: u64,
    output: String,
}

#[allow(clippy::too_many_arguments, reason = "one parameter per CLI flag")]
pub async fn run(
    config: &ClientConfig,
    endpoint: &str,
    query: &QueryArgs,
    page_size: Option<u32>,
    role: Role,
    out: Option<&Path>,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let loader = BulkDataLoader::from_config(config)
        .context("failed to build api client")?
        .with_role(role.into());
    let filters = parse_filters(&query.filters)?;
    let descriptor = RequestDescriptor::new(endpoint, query.base_id).with_filters(filters);

    let mut options = LoadOptions::new()
        .cancel_token(cancel)
        .on_progress(|loaded, total| {
            let percent = loaded.saturating_mul(100) / total.max(1);
            tracing::info!("progress: {loaded}/{total} ({percent}%)");
        })
        .on_batch(|rows, page| tracing::debug!("page {page} received with {} rows", rows.len()));
    if let Some(page_size) = page_size {
        options = options.page_size(page_size);
    }

    let result = loader
        .load_bulk_data(&descriptor, options)
        .await
        .with_context(|| format!("bulk load of {endpoint} failed"))?;

    write_rows(&result.rows, out, format)?;

    let summary = LoadSummary {
        endpoint,
        base_id: query.base_id,
        total_count: result.total_count,
        page_count: result.page_count,
        elapsed_ms: result.elapsed_ms,
        output: out
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "stdout".to_string()),
    };
    // Keep stdout clean for the rows themselves.
    if out.is_some() {
        print_json(&summary)
    } else {
        tracing::info!(
            "loaded {} rows in {} page(s) in {}ms",
            summary.total_count,
            summary.page_count,
            summary.elapsed_ms
        );
        Ok(())
    }
}
