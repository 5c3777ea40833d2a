use anyhow::{Context, Result};
use ari_bulk_loader::{count::resolve_count, ClientConfig, HttpTransport, RequestDescriptor};
use serde::Serialize;

use crate::{
    cli::QueryArgs,
    utils::{parse_filters, print_json},
};

#[derive(Serialize)]
struct CountOutput<'a> {
    endpoint: &'a str,
    base_id: i64,
    count: u64,
}

pub async fn run(config: &ClientConfig, endpoint: &str, query: &QueryArgs) -> Result<()> {
    let transport = HttpTransport::new(config).context("failed to build api client")?;
    let filters = parse_filters(&query.filters)?;
    let descriptor = RequestDescriptor::new(endpoint, query.base_id).with_filters(filters);

    let count = resolve_count(&transport, &descriptor)
        .await
        .with_context(|| format!("failed to count {endpoint}"))?;

    print_json(&CountOutput {
        endpoint,
        base_id: query.base_id,
        count,
    })
}
