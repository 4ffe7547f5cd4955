//! Test utilities and shared test helpers for stargraph.
//!
//! Provides an in-memory [`RemoteSource`] with failure injection and
//! concurrency accounting, plus timestamp fixtures used across the
//! workspace.

use crate::{
    error::{Result, StarGraphError},
    source::RemoteSource,
    types::{Page, RepositoryIdentity, StarEvent, Timestamp},
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, Once,
    },
    time::Duration,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Test fixture for creating a mock timestamp.
pub fn mock_timestamp(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Timestamp {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture timestamp {year}-{month}-{day}"))
}

/// `count` star events one day apart, starting at `start`
pub fn star_events(count: usize, start: Timestamp) -> Vec<StarEvent> {
    (0..count)
        .map(|i| StarEvent::new(start + ChronoDuration::days(i as i64)))
        .collect()
}

/// Identifies one page of one listing served by [`FakeSource`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageRef {
    Repositories { user: String, page: u32 },
    Stargazers { repo: RepositoryIdentity, page: u32 },
}

impl PageRef {
    pub fn repositories(user: impl Into<String>, page: u32) -> Self {
        Self::Repositories {
            user: user.into(),
            page,
        }
    }

    pub fn stargazers(repo: &RepositoryIdentity, page: u32) -> Self {
        Self::Stargazers {
            repo: repo.clone(),
            page,
        }
    }
}

/// In-memory remote source.
///
/// Listings are paginated by the `per_page` the caller asks for. Pages can
/// be made to fail with an HTTP status or to never complete, and every call
/// is counted. `in_flight` tracks calls currently executing so tests can
/// observe both the concurrency bound and that nothing outlives an
/// aborted operation.
#[derive(Debug, Default)]
pub struct FakeSource {
    repositories: HashMap<String, Vec<RepositoryIdentity>>,
    stars: HashMap<RepositoryIdentity, Vec<StarEvent>>,
    failures: HashMap<PageRef, u16>,
    pending: HashSet<PageRef>,
    delay: Option<Duration>,
    page_delays: HashMap<PageRef, Duration>,
    calls: Mutex<Vec<PageRef>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register repositories owned by `user`
    pub fn with_repositories(mut self, user: &str, names: &[&str]) -> Self {
        self.repositories.entry(user.to_string()).or_default().extend(
            names
                .iter()
                .map(|name| RepositoryIdentity::new(user, *name)),
        );
        self
    }

    /// Register star events for `repo`
    pub fn with_stars(mut self, repo: &RepositoryIdentity, events: Vec<StarEvent>) -> Self {
        self.stars.entry(repo.clone()).or_default().extend(events);
        self
    }

    /// Make a page fail with the given upstream HTTP status
    pub fn with_failure(mut self, page: PageRef, status: u16) -> Self {
        self.failures.insert(page, status);
        self
    }

    /// Make a page never complete
    pub fn with_pending(mut self, page: PageRef) -> Self {
        self.pending.insert(page);
        self
    }

    /// Delay every call, so concurrent calls overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay one page, on top of any delay applied to every call
    pub fn with_page_delay(mut self, page: PageRef, delay: Duration) -> Self {
        self.page_delays.insert(page, delay);
        self
    }

    /// Total number of calls made
    pub fn calls(&self) -> usize {
        self.lock_calls().len()
    }

    /// Number of calls made for a specific page
    pub fn calls_for(&self, page: &PageRef) -> usize {
        self.lock_calls().iter().filter(|call| *call == page).count()
    }

    /// Calls currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever executing at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<PageRef>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn serve<T: Clone>(&self, page_ref: PageRef, items: &[T], page: u32, per_page: u32) -> Result<Page<T>> {
        self.lock_calls().push(page_ref.clone());
        let _guard = InFlightGuard::enter(&self.in_flight, &self.max_in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(delay) = self.page_delays.get(&page_ref) {
            tokio::time::sleep(*delay).await;
        }
        if self.pending.contains(&page_ref) {
            std::future::pending::<()>().await;
        }
        if let Some(status) = self.failures.get(&page_ref) {
            return Err(StarGraphError::remote_with_status(
                format!("injected failure for {:?}", page_ref),
                *status,
            ));
        }

        Ok(paginate(items, page, per_page))
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn list_repositories_page(
        &self,
        user: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RepositoryIdentity>> {
        let repos = self.repositories.get(user).map(Vec::as_slice).unwrap_or(&[]);
        self.serve(PageRef::repositories(user, page), repos, page, per_page)
            .await
    }

    async fn list_stargazers_page(
        &self,
        repo: &RepositoryIdentity,
        page: u32,
        per_page: u32,
    ) -> Result<Page<StarEvent>> {
        let stars = self.stars.get(repo).map(Vec::as_slice).unwrap_or(&[]);
        self.serve(PageRef::stargazers(repo, page), stars, page, per_page)
            .await
    }
}

/// Slice `items` into 1-based pages of `per_page`
fn paginate<T: Clone>(items: &[T], page: u32, per_page: u32) -> Page<T> {
    let per_page = per_page.max(1) as usize;
    let last_page = items.len().div_ceil(per_page).max(1) as u32;
    let start = (page.saturating_sub(1) as usize).saturating_mul(per_page);
    let slice = items.iter().skip(start).take(per_page).cloned().collect();

    Page {
        items: slice,
        next_page: (page < last_page).then_some(page + 1),
        last_page,
    }
}

struct InFlightGuard<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}
