//! # Stargraph Graphs
//!
//! Concurrent, cache-backed collection of paginated GitHub listings and
//! rendering of the resulting stargazer history.
//!
//! Pages are fetched through a [`PageFetcher`] that consults the shared
//! [`PageCache`] first. A [`StarCollector`] materializes complete listings by
//! fetching page 1 and fanning out over the rest with [`FanOut`], and merges
//! the stargazers of every repository a user owns. [`build_series`] turns the
//! merged events into a cumulative series that [`SvgRenderer`] draws.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod collector;
pub mod fan_out;
pub mod fetcher;
pub mod listing;
pub mod renderer;
pub mod series;

pub use cache::{
    CacheConfig, CacheCost, CacheKey, CacheMetrics, CachedPage, PageCache, ResourceKind,
    TtlCache, DEFAULT_MAX_COST, DEFAULT_TTL,
};
pub use collector::StarCollector;
pub use fan_out::FanOut;
pub use fetcher::{PageFetcher, DEFAULT_PER_PAGE};
pub use listing::{Listing, RepositoryStargazers, UserRepositories};
pub use renderer::{parse_color, ChartStyle, SeriesRenderer, SvgRenderer, SVG_CONTENT_TYPE};
pub use series::build_series;
