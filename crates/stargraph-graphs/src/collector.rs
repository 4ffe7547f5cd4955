//! Materializes whole listings: one user's repositories, one repository's
//! stargazers, and the stargazers of every repository a user owns

use crate::fan_out::FanOut;
use crate::fetcher::PageFetcher;
use crate::listing::{Listing, RepositoryStargazers, UserRepositories};
use stargraph_common::{RepositoryIdentity, Result, StarEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Collects complete listings through the page cache, fanning out over
/// the pages after the first
#[derive(Debug, Clone)]
pub struct StarCollector {
    fetcher: PageFetcher,
    fan_out: FanOut,
}

impl StarCollector {
    pub fn new(fetcher: PageFetcher, fan_out: FanOut) -> Self {
        Self { fetcher, fan_out }
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    /// Every item of `listing`.
    ///
    /// Page 1 is fetched first; its items come first in the result. The
    /// pages `next..=last` it announces are then fetched concurrently and
    /// appended in completion order. Any page failure fails the whole
    /// listing, no partial collection is returned.
    #[instrument(skip(self, listing, token), fields(listing = %listing))]
    pub async fn collect_listing<L: Listing>(
        &self,
        listing: &L,
        token: &CancellationToken,
    ) -> Result<Vec<L::Item>> {
        let first = self.fetcher.fetch_page(listing, 1, token).await?;

        let next = match first.next_page {
            Some(next) if first.has_next() => next,
            _ => return Ok(first.items),
        };

        let remaining: Vec<u32> = (next..=first.last_page).collect();
        debug!(
            "Fanning out over pages {}..={} ({} pages)",
            next,
            first.last_page,
            remaining.len()
        );

        let mut items = first.items;
        let fetcher = self.fetcher.clone();
        let shared = listing.clone();
        let rest = self
            .fan_out
            .run(token, remaining, move |page, token| {
                let fetcher = fetcher.clone();
                let listing = shared.clone();
                async move {
                    fetcher
                        .fetch_page(&listing, page, &token)
                        .await
                        .map(|page| page.items)
                }
            })
            .await?;

        items.extend(rest);
        Ok(items)
    }

    /// All repositories owned by `user`
    pub async fn list_repositories(
        &self,
        user: &str,
        token: &CancellationToken,
    ) -> Result<Vec<RepositoryIdentity>> {
        self.collect_listing(&UserRepositories::new(user), token)
            .await
    }

    /// All star events of `repo`
    pub async fn list_stargazers(
        &self,
        repo: &RepositoryIdentity,
        token: &CancellationToken,
    ) -> Result<Vec<StarEvent>> {
        self.collect_listing(&RepositoryStargazers::new(repo.clone()), token)
            .await
    }

    /// Star events of every repository owned by `user`, merged.
    ///
    /// Repositories are collected concurrently as one fail-fast unit: a
    /// failure in any repository aborts the others and fails the request.
    #[instrument(skip(self, token))]
    pub async fn list_all_stargazers(
        &self,
        user: &str,
        token: &CancellationToken,
    ) -> Result<Vec<StarEvent>> {
        let repos = self.list_repositories(user, token).await?;
        info!("Collecting stargazers across {} repositories", repos.len());

        let collector = self.clone();
        let events = self
            .fan_out
            .run(token, repos, move |repo, token| {
                let collector = collector.clone();
                async move {
                    let events = collector.list_stargazers(&repo, &token).await?;
                    info!("{} has {} stargazers", repo, events.len());
                    Ok(events)
                }
            })
            .await?;

        info!("Collected {} star events for {}", events.len(), user);
        Ok(events)
    }
}
