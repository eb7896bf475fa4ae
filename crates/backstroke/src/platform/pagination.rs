//! Drive a paged listing endpoint to completion.

use std::future::Future;

use tracing::{debug, warn};

/// Page size used when a caller has no preference.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Arguments handed to the listing call for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    pub per_page: u32,
}

/// Fetch pages starting at page 0 until one comes back short.
///
/// A page with exactly `page_size` items means more may follow. A page with
/// more than `page_size` items is discarded and ends the listing. The first
/// failing call aborts and its error is returned.
pub async fn paginate<T, E, F, Fut>(mut fetch: F, page_size: u32) -> Result<Vec<T>, E>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let per_page = page_size.max(1);
    let limit = per_page as usize;
    let mut items = Vec::new();
    let mut page = 0;

    loop {
        let batch = fetch(PageRequest { page, per_page }).await?;
        let len = batch.len();

        if len > limit {
            warn!(page, len, per_page, "page larger than requested, stopping");
            return Ok(items);
        }

        items.extend(batch);

        if len < limit {
            debug!(pages = page + 1, total = items.len(), "pagination complete");
            return Ok(items);
        }

        page += 1;
    }
}
