//! The paginated remote data source the fetch engine reads from

use crate::{
    error::Result,
    types::{Page, RepositoryIdentity, StarEvent},
};
use async_trait::async_trait;

/// A remote service exposing paginated repository and stargazer listings.
///
/// Pages are 1-based. Implementations report the listing's last page
/// alongside every page so callers can fan out over the remainder after
/// reading page 1.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// One page of the repositories owned by `user`, oldest first
    async fn list_repositories_page(
        &self,
        user: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RepositoryIdentity>>;

    /// One page of the star events recorded on `repo`
    async fn list_stargazers_page(
        &self,
        repo: &RepositoryIdentity,
        page: u32,
        per_page: u32,
    ) -> Result<Page<StarEvent>>;
}
