//! Paginated listings the fetch engine knows how to cache and collect

use crate::cache::{CacheKey, CachedPage};
use async_trait::async_trait;
use stargraph_common::{Page, RemoteSource, RepositoryIdentity, Result, StarEvent};
use std::fmt;

/// One paginated remote listing: how to key its pages in the cache, how to
/// fetch a page, and how its pages are stored.
#[async_trait]
pub trait Listing: fmt::Display + Clone + Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn cache_key(&self, page: u32) -> CacheKey;

    async fn fetch_remote(
        &self,
        source: &dyn RemoteSource,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Self::Item>>;

    fn to_cached(page: Page<Self::Item>) -> CachedPage;

    /// `None` when the cached value belongs to a different listing kind
    fn from_cached(cached: CachedPage) -> Option<Page<Self::Item>>;
}

/// Repositories owned by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRepositories {
    pub user: String,
}

impl UserRepositories {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

impl fmt::Display for UserRepositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repositories of {}", self.user)
    }
}

#[async_trait]
impl Listing for UserRepositories {
    type Item = RepositoryIdentity;

    fn cache_key(&self, page: u32) -> CacheKey {
        CacheKey::repositories(self.user.clone(), page)
    }

    async fn fetch_remote(
        &self,
        source: &dyn RemoteSource,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RepositoryIdentity>> {
        source.list_repositories_page(&self.user, page, per_page).await
    }

    fn to_cached(page: Page<RepositoryIdentity>) -> CachedPage {
        CachedPage::Repositories(page)
    }

    fn from_cached(cached: CachedPage) -> Option<Page<RepositoryIdentity>> {
        match cached {
            CachedPage::Repositories(page) => Some(page),
            CachedPage::Stargazers(_) => None,
        }
    }
}

/// Star events recorded on one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStargazers {
    pub repo: RepositoryIdentity,
}

impl RepositoryStargazers {
    pub fn new(repo: RepositoryIdentity) -> Self {
        Self { repo }
    }
}

impl fmt::Display for RepositoryStargazers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stargazers of {}", self.repo)
    }
}

#[async_trait]
impl Listing for RepositoryStargazers {
    type Item = StarEvent;

    fn cache_key(&self, page: u32) -> CacheKey {
        CacheKey::stargazers(&self.repo, page)
    }

    async fn fetch_remote(
        &self,
        source: &dyn RemoteSource,
        page: u32,
        per_page: u32,
    ) -> Result<Page<StarEvent>> {
        source.list_stargazers_page(&self.repo, page, per_page).await
    }

    fn to_cached(page: Page<StarEvent>) -> CachedPage {
        CachedPage::Stargazers(page)
    }

    fn from_cached(cached: CachedPage) -> Option<Page<StarEvent>> {
        match cached {
            CachedPage::Stargazers(page) => Some(page),
            CachedPage::Repositories(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_shape_is_rejected() {
        let repos = CachedPage::Repositories(Page::last(vec![RepositoryIdentity::new("a", "b")], 1));
        assert!(RepositoryStargazers::from_cached(repos.clone()).is_none());
        assert!(UserRepositories::from_cached(repos).is_some());
    }

    #[test]
    fn test_listing_keys() {
        let repo = RepositoryIdentity::new("octocat", "hello-world");
        assert_eq!(
            UserRepositories::new("octocat").cache_key(2).to_string(),
            "repos/octocat/2"
        );
        assert_eq!(
            RepositoryStargazers::new(repo).cache_key(1).to_string(),
            "gazers/octocat/hello-world/1"
        );
    }
}
