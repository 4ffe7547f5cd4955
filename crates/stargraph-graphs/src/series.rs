//! Cumulative stargazer series

use stargraph_common::{StarEvent, TimeSeriesPoint, Timestamp};
use tracing::warn;

/// Turn star events into a cumulative count series.
///
/// Events are sorted ascending by time (stable for equal timestamps) and the
/// i-th event becomes the point `(starred_at, i)`. A renderer needs at least
/// two points, so shorter series get a synthetic point at `now` with a
/// count of 1: one event yields `[(t, 0), (now, 1)]` and no events yield
/// `[(now, 0), (now, 1)]`.
pub fn build_series(events: &[StarEvent], now: Timestamp) -> Vec<TimeSeriesPoint> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|event| event.starred_at);

    let mut series: Vec<TimeSeriesPoint> = sorted
        .iter()
        .enumerate()
        .map(|(i, event)| TimeSeriesPoint::new(event.starred_at, i as u64))
        .collect();

    if series.len() < 2 {
        warn!(
            "Only {} star events, padding series with a point at {}",
            series.len(),
            now
        );
        if series.is_empty() {
            series.push(TimeSeriesPoint::new(now, 0));
        }
        series.push(TimeSeriesPoint::new(now, 1));
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stargraph_common::test_utils::mock_timestamp;

    #[test]
    fn test_unsorted_input_is_ordered() {
        let t1 = mock_timestamp(2020, 1, 1, 0, 0, 0);
        let t2 = mock_timestamp(2020, 6, 1, 0, 0, 0);
        let t3 = mock_timestamp(2021, 1, 1, 0, 0, 0);
        let now = mock_timestamp(2024, 1, 1, 0, 0, 0);

        let series = build_series(
            &[StarEvent::new(t3), StarEvent::new(t1), StarEvent::new(t2)],
            now,
        );

        assert_eq!(
            series,
            vec![
                TimeSeriesPoint::new(t1, 0),
                TimeSeriesPoint::new(t2, 1),
                TimeSeriesPoint::new(t3, 2),
            ]
        );
    }

    #[test]
    fn test_single_event_gets_synthetic_point_at_now() {
        let t = mock_timestamp(2019, 3, 4, 5, 6, 7);
        let now = mock_timestamp(2024, 1, 1, 0, 0, 0);

        let series = build_series(&[StarEvent::new(t)], now);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0], TimeSeriesPoint::new(t, 0));
        assert_eq!(series[1].timestamp, now);
        assert_eq!(series[1].cumulative_count, 1);
    }

    #[test]
    fn test_no_events_still_drawable() {
        let now = mock_timestamp(2024, 1, 1, 0, 0, 0);

        let series = build_series(&[], now);

        assert_eq!(
            series,
            vec![TimeSeriesPoint::new(now, 0), TimeSeriesPoint::new(now, 1)]
        );
    }

    #[test]
    fn test_equal_timestamps_are_kept() {
        let t = mock_timestamp(2022, 2, 2, 0, 0, 0);
        let now = mock_timestamp(2024, 1, 1, 0, 0, 0);

        let series = build_series(&[StarEvent::new(t); 3], now);

        assert_eq!(series.len(), 3);
        assert_eq!(series[2].cumulative_count, 2);
    }

    proptest! {
        #[test]
        fn test_series_is_monotonic(offsets in prop::collection::vec(0i64..1_000_000_000, 2..200)) {
            let base = mock_timestamp(2010, 1, 1, 0, 0, 0);
            let now = mock_timestamp(2050, 1, 1, 0, 0, 0);
            let events: Vec<StarEvent> = offsets
                .iter()
                .map(|secs| StarEvent::new(base + chrono::Duration::seconds(*secs)))
                .collect();

            let series = build_series(&events, now);

            prop_assert_eq!(series.len(), events.len());
            for (i, pair) in series.windows(2).enumerate() {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
                prop_assert_eq!(pair[1].cumulative_count, i as u64 + 1);
            }
        }
    }
}
