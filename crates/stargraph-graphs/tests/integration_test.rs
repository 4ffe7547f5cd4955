//! Integration tests for stargraph-graphs.
//!
//! These drive the collector end to end against the in-memory source and
//! check the concurrency, fail-fast and caching behavior of the engine.

use proptest::prelude::*;
use stargraph_common::test_utils::{
    init_test_logging, mock_timestamp, star_events, FakeSource, PageRef,
};
use stargraph_common::{RepositoryIdentity, StarEvent};
use stargraph_graphs::{
    build_series, CacheConfig, FanOut, PageCache, PageFetcher, SeriesRenderer, StarCollector,
    SvgRenderer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TEST_DEADLINE: Duration = Duration::from_secs(10);

fn collector_with(source: Arc<FakeSource>, per_page: u32, fan_out: FanOut) -> StarCollector {
    let cache = Arc::new(PageCache::new(CacheConfig::default()));
    StarCollector::new(PageFetcher::new(source, cache, per_page), fan_out)
}

fn stars_of(repo: &RepositoryIdentity, count: usize) -> Vec<StarEvent> {
    star_events(count, mock_timestamp(2020, 1, 1, 0, 0, 0))
        .into_iter()
        .map(|event| StarEvent::new(event.starred_at + chrono::Duration::minutes(repo.name.len() as i64)))
        .collect()
}

#[tokio::test]
async fn test_pages_are_fetched_concurrently() {
    init_test_logging();
    let repo = RepositoryIdentity::new("octo", "busy");
    let source = Arc::new(
        FakeSource::new()
            .with_stars(&repo, stars_of(&repo, 50))
            .with_delay(Duration::from_millis(30)),
    );

    let events = tokio::time::timeout(
        TEST_DEADLINE,
        collector_with(source.clone(), 5, FanOut::unbounded())
            .list_stargazers(&repo, &CancellationToken::new()),
    )
    .await
    .expect("collection did not finish")
    .unwrap();

    assert_eq!(events.len(), 50);
    assert_eq!(source.calls(), 10);
    assert!(source.max_in_flight() > 1, "pages were fetched one at a time");
    assert_eq!(source.in_flight(), 0);
}

#[tokio::test]
async fn test_concurrency_bound_limits_in_flight_pages() {
    let repo = RepositoryIdentity::new("octo", "bounded");
    let source = Arc::new(
        FakeSource::new()
            .with_stars(&repo, stars_of(&repo, 40))
            .with_delay(Duration::from_millis(10)),
    );

    let events = tokio::time::timeout(
        TEST_DEADLINE,
        collector_with(source.clone(), 2, FanOut::new(Some(3)))
            .list_stargazers(&repo, &CancellationToken::new()),
    )
    .await
    .expect("collection did not finish")
    .unwrap();

    assert_eq!(events.len(), 40);
    assert!(source.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_failing_page_aborts_siblings_without_leaks() {
    init_test_logging();
    let repo = RepositoryIdentity::new("octo", "flaky");
    let source = Arc::new(
        FakeSource::new()
            .with_stars(&repo, stars_of(&repo, 30))
            .with_pending(PageRef::stargazers(&repo, 2))
            .with_pending(PageRef::stargazers(&repo, 3))
            .with_failure(PageRef::stargazers(&repo, 5), 502),
    );

    let err = tokio::time::timeout(
        TEST_DEADLINE,
        collector_with(source.clone(), 5, FanOut::unbounded())
            .list_stargazers(&repo, &CancellationToken::new()),
    )
    .await
    .expect("fan-out hung after a page failure")
    .unwrap_err();

    assert!(!err.is_cancelled());
    assert_eq!(err.status_code(), Some(502));
    assert_eq!(source.in_flight(), 0, "a unit outlived the aggregation");
}

#[tokio::test]
async fn test_failing_repository_aborts_whole_aggregation() {
    let a = RepositoryIdentity::new("octo", "a");
    let b = RepositoryIdentity::new("octo", "b");
    let source = Arc::new(
        FakeSource::new()
            .with_repositories("octo", &["a", "b"])
            .with_stars(&a, stars_of(&a, 10))
            .with_stars(&b, stars_of(&b, 10))
            .with_pending(PageRef::stargazers(&a, 2))
            .with_failure(PageRef::stargazers(&b, 1), 404),
    );

    let err = tokio::time::timeout(
        TEST_DEADLINE,
        collector_with(source.clone(), 5, FanOut::unbounded())
            .list_all_stargazers("octo", &CancellationToken::new()),
    )
    .await
    .expect("aggregation hung after a repository failure")
    .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(source.in_flight(), 0);
}

#[tokio::test]
async fn test_caller_cancellation_reaches_nested_fan_outs() {
    let a = RepositoryIdentity::new("octo", "a");
    let b = RepositoryIdentity::new("octo", "b");
    let source = Arc::new(
        FakeSource::new()
            .with_repositories("octo", &["a", "b"])
            .with_stars(&a, stars_of(&a, 10))
            .with_stars(&b, stars_of(&b, 10))
            .with_pending(PageRef::stargazers(&a, 2))
            .with_pending(PageRef::stargazers(&b, 3)),
    );
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = tokio::time::timeout(
        TEST_DEADLINE,
        collector_with(source.clone(), 5, FanOut::unbounded()).list_all_stargazers("octo", &token),
    )
    .await
    .expect("cancellation did not propagate")
    .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(source.in_flight(), 0);
}

fn skewed_source(slow: &RepositoryIdentity, a: &RepositoryIdentity, b: &RepositoryIdentity) -> Arc<FakeSource> {
    Arc::new(
        FakeSource::new()
            .with_repositories("octo", &["a", "b"])
            .with_stars(a, stars_of(a, 5))
            .with_stars(b, stars_of(b, 3))
            .with_page_delay(PageRef::stargazers(slow, 1), Duration::from_millis(40))
            .with_page_delay(PageRef::stargazers(slow, 2), Duration::from_millis(20)),
    )
}

#[tokio::test]
async fn test_multi_repository_union() {
    let a = RepositoryIdentity::new("octo", "a");
    let b = RepositoryIdentity::new("octo", "b");
    let mut expected = stars_of(&a, 5);
    expected.extend(stars_of(&b, 3));
    expected.sort();

    // Either repository finishing first yields the same union
    for slow in [&a, &b] {
        let mut events = tokio::time::timeout(
            TEST_DEADLINE,
            collector_with(skewed_source(slow, &a, &b), 2, FanOut::unbounded())
                .list_all_stargazers("octo", &CancellationToken::new()),
        )
        .await
        .expect("aggregation did not finish")
        .unwrap();

        events.sort();
        assert_eq!(events.len(), 8);
        assert_eq!(events, expected, "union differs when {} finishes last", slow);
    }
}

#[tokio::test]
async fn test_repeated_collection_is_served_from_cache() {
    let a = RepositoryIdentity::new("octo", "a");
    let source = Arc::new(
        FakeSource::new()
            .with_repositories("octo", &["a"])
            .with_stars(&a, stars_of(&a, 7)),
    );
    let collector = collector_with(source.clone(), 3, FanOut::unbounded());
    let token = CancellationToken::new();

    let first = collector.list_all_stargazers("octo", &token).await.unwrap();
    let calls = source.calls();
    let second = collector.list_all_stargazers("octo", &token).await.unwrap();

    assert_eq!(first.len(), 7);
    assert_eq!(second.len(), 7);
    // 1 repository page + 3 stargazer pages
    assert_eq!(calls, 4);
    assert_eq!(source.calls(), calls);
}

#[tokio::test]
async fn test_collect_build_and_render() {
    let repo = RepositoryIdentity::new("octo", "chart");
    let source = Arc::new(FakeSource::new().with_stars(&repo, stars_of(&repo, 12)));
    let now = mock_timestamp(2024, 1, 1, 0, 0, 0);

    let events = collector_with(source, 5, FanOut::unbounded())
        .list_stargazers(&repo, &CancellationToken::new())
        .await
        .unwrap();
    let series = build_series(&events, now);
    let renderer = SvgRenderer::default();

    let first = renderer.render(&series).await.unwrap();
    let second = renderer.render(&build_series(&events, now)).await.unwrap();

    assert_eq!(series.len(), 12);
    assert_eq!(first, second);
    assert!(String::from_utf8_lossy(&first).contains("<svg"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_fan_out_is_permutation_invariant(delays in prop::collection::vec(0u64..15, 1..24)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pages = delays.len() as u32;

        let mut merged = runtime.block_on(async {
            let delays = Arc::new(delays);
            FanOut::unbounded()
                .run(&CancellationToken::new(), (1..=pages).collect(), move |page, _| {
                    let delay = delays[(page - 1) as usize];
                    async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        Ok(vec![page * 100, page * 100 + 1])
                    }
                })
                .await
        })
        .unwrap();

        merged.sort_unstable();
        let expected: Vec<u32> = (1..=pages).flat_map(|page| [page * 100, page * 100 + 1]).collect();
        prop_assert_eq!(merged, expected);
    }
}
