use std::path::Path;

use anyhow::{Context, Result};
use ari_bulk_loader::{BulkClientLoader, BulkDataLoader, CancellationToken, ClientConfig};
use serde::Serialize;

use crate::{
    cli::{OutputFormat, QueryArgs, Role},
    utils::{parse_filters, print_json, write_rows},
};

#[derive(Serialize)]
struct RunSummary {
    run: u32,
    from_cache: bool,
    rows: usize,
    page_count: u64,
    elapsed_ms: u64,
    cache_size: usize,
}

pub async fn run(
    config: &ClientConfig,
    query: &QueryArgs,
    role: Role,
    use_cache: bool,
    repeat: u32,
    out: Option<&Path>,
    cancel: CancellationToken,
) -> Result<()> {
    let loader = BulkDataLoader::from_config(config)
        .context("failed to build api client")?
        .with_role(role.into());
    let mut clients = BulkClientLoader::new(loader);
    let filters = parse_filters(&query.filters)?;

    let mut last_rows = Vec::new();
    for run in 1..=repeat.max(1) {
        let loaded = clients
            .load_clients(query.base_id, filters.clone(), use_cache, cancel.clone())
            .await
            .with_context(|| format!("client load {run} failed"))?;

        print_json(&RunSummary {
            run,
            from_cache: loaded.from_cache,
            rows: loaded.total_count(),
            page_count: loaded.page_count,
            elapsed_ms: loaded.elapsed_ms,
            cache_size: clients.cache_size(),
        })?;
        last_rows = loaded.rows;
    }

    if let Some(path) = out {
        write_rows(&last_rows, Some(path), OutputFormat::Json)?;
        tracing::info!("wrote {} rows to {}", last_rows.len(), path.display());
    }
    Ok(())
}
