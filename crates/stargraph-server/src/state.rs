//! Shared state handed to every request handler

use axum::body::Bytes;
use stargraph_common::{RemoteSource, Result};
use stargraph_config::Config;
use stargraph_graphs::{
    CacheConfig, CacheCost, ChartStyle, FanOut, PageCache, PageFetcher, SeriesRenderer,
    StarCollector, SvgRenderer, TtlCache,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A rendered chart body
#[derive(Debug, Clone)]
pub struct RenderedChart(pub Bytes);

impl CacheCost for RenderedChart {
    fn cost(&self) -> u64 {
        self.0.len() as u64
    }
}

/// Rendered charts keyed by `svg/{user}/{repo}`
pub type ResponseCache = TtlCache<String, RenderedChart>;

/// Shared application state for the HTTP boundary
#[derive(Clone)]
pub struct AppState {
    /// Collects listings through the page cache
    pub collector: StarCollector,
    /// Draws the cumulative series
    pub renderer: Arc<dyn SeriesRenderer>,
    /// Cache of rendered responses
    pub responses: Arc<ResponseCache>,
    /// Lifetime of a rendered response in `responses`
    pub response_ttl: Duration,
}

impl AppState {
    pub fn new(
        collector: StarCollector,
        renderer: Arc<dyn SeriesRenderer>,
        responses: Arc<ResponseCache>,
        response_ttl: Duration,
    ) -> Self {
        Self {
            collector,
            renderer,
            responses,
            response_ttl,
        }
    }

    /// Wire the engine from configuration around `source`
    pub fn from_config(config: &Config, source: Arc<dyn RemoteSource>) -> Result<Self> {
        let page_cache_config = CacheConfig {
            max_cost: config.cache.max_cost,
            default_ttl: config.cache.ttl(),
            enabled: config.cache.enabled,
        };
        let response_cache_config = CacheConfig {
            default_ttl: config.cache.response_ttl(),
            ..page_cache_config.clone()
        };

        let fetcher = PageFetcher::new(
            source,
            Arc::new(PageCache::new(page_cache_config)),
            config.github.per_page,
        );
        let collector = StarCollector::new(fetcher, FanOut::new(config.fan_out.max_concurrency));

        let style = ChartStyle::from_hex(
            config.graph.width,
            config.graph.height,
            &config.graph.line_color,
            &config.graph.axis_color,
            config.graph.line_width,
        )?;

        Ok(Self::new(
            collector,
            Arc::new(SvgRenderer::new(style)),
            Arc::new(ResponseCache::new(response_cache_config)),
            config.cache.response_ttl(),
        ))
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("collector", &self.collector)
            .field("responses", &self.responses)
            .field("response_ttl", &self.response_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stargraph_common::test_utils::FakeSource;

    #[test]
    fn test_from_default_config() {
        let config = Config::default();
        let state = AppState::from_config(&config, Arc::new(FakeSource::new())).unwrap();

        assert_eq!(state.response_ttl, Duration::from_secs(86_400));
        assert_eq!(state.collector.fetcher().per_page(), 100);
        assert!(state.responses.config().enabled);
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        let mut config = Config::default();
        config.graph.line_color = "blue".to_string();

        assert!(AppState::from_config(&config, Arc::new(FakeSource::new())).is_err());
    }

    #[test]
    fn test_rendered_chart_cost() {
        assert_eq!(RenderedChart(Bytes::from_static(b"<svg/>")).cost(), 6);
    }
}
