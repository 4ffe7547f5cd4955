//! Cache-backed fetch of a single listing page

use crate::cache::PageCache;
use crate::listing::Listing;
use stargraph_common::{Page, RemoteSource, Result, StarGraphError};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Page size requested from the remote source
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Fetches listing pages, serving from the page cache when possible
#[derive(Clone)]
pub struct PageFetcher {
    source: Arc<dyn RemoteSource>,
    cache: Arc<PageCache>,
    per_page: u32,
}

impl PageFetcher {
    pub fn new(source: Arc<dyn RemoteSource>, cache: Arc<PageCache>, per_page: u32) -> Self {
        Self {
            source,
            cache,
            per_page: per_page.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetch one page of `listing`.
    ///
    /// A cached page is returned without a remote call. On a miss the page
    /// is fetched, stored with the default ttl and returned. Two callers
    /// racing on the same uncached page may both reach the remote source.
    #[instrument(skip(self, listing, token), fields(listing = %listing))]
    pub async fn fetch_page<L: Listing>(
        &self,
        listing: &L,
        page: u32,
        token: &CancellationToken,
    ) -> Result<Page<L::Item>> {
        let key = listing.cache_key(page);

        if let Some(cached) = self.cache.get(&key).await {
            match L::from_cached(cached) {
                Some(page) => return Ok(page),
                None => warn!("Cached value for {} has the wrong shape, refetching", key),
            }
        }

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(StarGraphError::cancelled(format!("fetch of {} cancelled", key)));
            }
            result = listing.fetch_remote(self.source.as_ref(), page, self.per_page) => result?,
        };

        debug!(
            items = fetched.items.len(),
            next = ?fetched.next_page,
            last = fetched.last_page,
            "Fetched page from remote"
        );
        self.cache.set_default(key, L::to_cached(fetched.clone())).await;

        Ok(fetched)
    }
}

impl fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFetcher")
            .field("cache", &self.cache)
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}
