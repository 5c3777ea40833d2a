//! Page fetcher: one bounded request for one page of a collection.

use crate::{
    error::{LoadResult, SchemaError},
    transport::{decode_envelope, ApiTransport},
    types::{PageDescriptor, Record, RequestDescriptor, SnapshotMarker, SortSpec},
};

const PAGING_PARAMS: [&str; 7] =
    ["per_page", "page", "limit", "offset", "_snapshot", "sort_by", "sort_order"];

/// Query parameters for one page request.
///
/// Both `per_page`/`page` and the legacy `limit`/`offset` pair are sent.
/// Filters sharing a name with a paging parameter are dropped so every key
/// appears once.
pub fn page_query(
    descriptor: &RequestDescriptor,
    page: PageDescriptor,
    snapshot: &SnapshotMarker,
    sort: &SortSpec,
) -> Vec<(String, String)> {
    let mut query = descriptor.base_query();
    query.retain(|(key, _)| {
        let reserved = PAGING_PARAMS.contains(&key.as_str());
        if reserved {
            tracing::warn!(filter = %key, "filter shadows a paging parameter; not sent");
        }
        !reserved
    });
    query.extend([
        ("per_page".to_string(), page.page_size.to_string()),
        ("page".to_string(), page.page_number.to_string()),
        ("limit".to_string(), page.page_size.to_string()),
        ("offset".to_string(), page.offset().to_string()),
        ("_snapshot".to_string(), snapshot.as_str().to_string()),
        ("sort_by".to_string(), sort.sort_by.clone()),
        ("sort_order".to_string(), sort.order.as_str().to_string()),
    ]);
    query
}

/// Fetch the rows of one page.
///
/// A page holding more rows than `page.page_size` is rejected as malformed.
pub async fn fetch_page(
    transport: &dyn ApiTransport,
    descriptor: &RequestDescriptor,
    page: PageDescriptor,
    snapshot: &SnapshotMarker,
    sort: &SortSpec,
) -> LoadResult<Vec<Record>> {
    let path = descriptor.endpoint();
    let query = page_query(descriptor, page, snapshot, sort);
    let body = transport.get(path, &query).await?;
    let rows: Vec<Record> = decode_envelope(path, &body)?;
    if rows.len() > page.page_size as usize {
        return Err(SchemaError::new(
            path,
            format!(
                "page {} returned {} rows, more than the page size {}",
                page.page_number,
                rows.len(),
                page.page_size
            ),
        )
        .into());
    }
    Ok(rows)
}
