//! Count resolver: one request for the total number of rows.

use serde::Deserialize;

use crate::{
    error::LoadResult,
    transport::{decode_envelope, ApiTransport},
    types::RequestDescriptor,
};

#[derive(Deserialize)]
struct CountPayload {
    count: u64,
}

/// Path of the count endpoint for `endpoint`.
///
/// Endpoints whose last segment is already `count` are used as they are.
pub fn count_path(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.rsplit('/').next() == Some("count") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/count")
    }
}

/// Ask the API how many rows match `descriptor`.
///
/// Zero is a valid answer. Transport failures are returned unchanged and never
/// retried.
pub async fn resolve_count(
    transport: &dyn ApiTransport,
    descriptor: &RequestDescriptor,
) -> LoadResult<u64> {
    let path = count_path(descriptor.endpoint());
    let body = transport.get(&path, &descriptor.base_query()).await?;
    let payload: CountPayload = decode_envelope(&path, &body)?;
    Ok(payload.count)
}
