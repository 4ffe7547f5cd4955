//! Domain types shared by the fetch engine, the renderer and the server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the application
pub type Timestamp = DateTime<Utc>;

/// A repository, identified by its owner login and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub name: String,
}

impl RepositoryIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One starring action on a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StarEvent {
    pub starred_at: Timestamp,
}

impl StarEvent {
    pub fn new(starred_at: Timestamp) -> Self {
        Self { starred_at }
    }
}

/// One bounded slice of a paginated remote listing.
///
/// `next_page` is `None` on the final page. `last_page` is the upper bound
/// reported alongside the first page and is assumed stable for the rest of
/// the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
    pub last_page: u32,
}

impl<T> Page<T> {
    /// A single page that ends the listing
    pub fn last(items: Vec<T>, page: u32) -> Self {
        Self {
            items,
            next_page: None,
            last_page: page,
        }
    }

    /// Whether more pages follow this one; a next page of 0 ends the listing
    pub fn has_next(&self) -> bool {
        self.next_page.is_some_and(|page| page > 0)
    }
}

/// A point of the cumulative stargazer series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: Timestamp,
    pub cumulative_count: u64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: Timestamp, cumulative_count: u64) -> Self {
        Self {
            timestamp,
            cumulative_count,
        }
    }
}
