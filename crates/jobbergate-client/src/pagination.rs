//! Walking paginated listings.

use jobbergate_state::Page;
use std::future::Future;

use crate::error::ClientError;

/// Upper bound on pages fetched for one listing.
pub const MAX_PAGES: u64 = 1000;

/// Fetch pages starting at 1 until the API reports the last one.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ClientError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Page<T>, ClientError>>,
{
    let mut items = Vec::new();
    for page in 1..=MAX_PAGES {
        let batch = fetch(page).await?;
        let last = batch.is_last();
        items.extend(batch.items);
        if last {
            return Ok(items);
        }
    }
    Err(ClientError::TooManyPages(MAX_PAGES))
}
