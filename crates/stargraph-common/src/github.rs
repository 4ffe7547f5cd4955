//! GitHub REST API client with rate limiting and retry logic
//!
//! Implements [`RemoteSource`] over the public GitHub API. Pagination
//! metadata comes from the `Link` response header; star timestamps require
//! the `application/vnd.github.star+json` media type.

use crate::{
    error::{Result, StarGraphError},
    source::RemoteSource,
    types::{Page, RepositoryIdentity, StarEvent, Timestamp},
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::{fmt, num::NonZeroU32, sync::Arc, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, instrument, warn};
use url::Url;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Media type that makes the stargazers endpoint include `starred_at`
pub const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Configuration for the GitHub API client
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Base URL of the API (e.g., "https://api.github.com")
    pub base_url: String,
    /// Personal access token, sent as a bearer token when present
    pub token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Connection pool max idle connections per host (default: 10)
    pub max_idle_per_host: usize,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u32,
    /// Maximum number of retry attempts for transient failures (default: 3)
    pub max_retries: usize,
    /// Base delay multiplier for the exponential backoff (default: 100ms)
    pub retry_base_delay_ms: u64,
    /// User-Agent header, required by GitHub
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_secs: 30,
            max_idle_per_host: 10,
            rate_limit_per_sec: 10,
            max_retries: 3,
            retry_base_delay_ms: 100,
            user_agent: concat!("stargraph/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GitHubConfig {
    /// Create a new configuration pointing at the given API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the access token; empty tokens are treated as absent
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the rate limit
    pub fn with_rate_limit(mut self, rate_limit_per_sec: u32) -> Self {
        self.rate_limit_per_sec = rate_limit_per_sec;
        self
    }

    /// Set the maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff base delay
    pub fn with_retry_base_delay(mut self, retry_base_delay_ms: u64) -> Self {
        self.retry_base_delay_ms = retry_base_delay_ms;
        self
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// GitHub API client with connection pooling and rate limiting
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
    base_url: Url,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.config.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a new GitHub client with the given configuration
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StarGraphError::config_with_source("Failed to create HTTP client", e))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            StarGraphError::config_with_source(format!("Invalid API URL: {}", config.base_url), e)
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StarGraphError::config(format!(
                "API URL cannot be used as a base: {}",
                config.base_url
            )));
        }

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limit_per_sec)
                .ok_or_else(|| StarGraphError::config("Rate limit must be greater than 0"))?,
        );
        let rate_limiter = Arc::new(DefaultDirectRateLimiter::direct(quota));

        Ok(Self {
            client,
            config,
            base_url,
            rate_limiter,
        })
    }

    /// Create a client for the public API with default settings
    pub fn with_defaults(token: Option<String>) -> Result<Self> {
        Self::new(GitHubConfig::default().with_token(token))
    }

    /// Build an endpoint URL below the configured base from path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StarGraphError::config("API URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch one page of a JSON array listing, retrying transient failures
    #[instrument(skip(self, url), fields(url = %url))]
    async fn get_page<T>(&self, url: Url, accept: &str, page: u32, per_page: u32) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let query = [
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ];

        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.retry_base_delay_ms)
            .max_delay(Duration::from_secs(10))
            .take(self.config.max_retries);

        let (url, query) = (&url, &query);
        let (items, links) = RetryIf::start(
            retry_strategy,
            || async move {
                self.rate_limiter.until_ready().await;

                let mut request = self
                    .client
                    .get(url.clone())
                    .query(&query)
                    .header(header::ACCEPT, accept);
                if let Some(token) = &self.config.token {
                    request = request.bearer_auth(token);
                }

                debug!("Sending request");
                let response = request.send().await.map_err(|e| {
                    warn!("Request failed: {}", e);
                    StarGraphError::from(e)
                })?;

                let status = response.status();
                if !status.is_success() {
                    let err = status_error(&response, status);
                    if err.is_retryable() {
                        warn!("Server error, will retry: {}", status);
                    } else {
                        debug!("Client error, not retrying: {}", status);
                    }
                    return Err(err);
                }

                let links = response
                    .headers()
                    .get(header::LINK)
                    .and_then(|value| value.to_str().ok())
                    .map(parse_link_header)
                    .unwrap_or_default();

                let items = response.json::<Vec<T>>().await.map_err(|e| {
                    StarGraphError::remote(format!("Failed to decode response body: {}", e))
                })?;

                Ok((items, links))
            },
            |err: &StarGraphError| err.is_retryable(),
        )
        .await?;

        let last_page = links.last.or(links.next).unwrap_or(page).max(page);
        debug!(
            "Fetched {} items, next: {:?}, last: {}",
            items.len(),
            links.next,
            last_page
        );

        Ok(Page {
            items,
            next_page: links.next,
            last_page,
        })
    }
}

#[async_trait]
impl RemoteSource for GitHubClient {
    #[instrument(skip(self))]
    async fn list_repositories_page(
        &self,
        user: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RepositoryIdentity>> {
        let mut url = self.endpoint(&["users", user, "repos"])?;
        url.query_pairs_mut().append_pair("sort", "created");

        let payload: Page<RepositoryPayload> =
            self.get_page(url, JSON_MEDIA_TYPE, page, per_page).await?;

        Ok(Page {
            items: payload
                .items
                .into_iter()
                .map(|repo| RepositoryIdentity::new(repo.owner.login, repo.name))
                .collect(),
            next_page: payload.next_page,
            last_page: payload.last_page,
        })
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn list_stargazers_page(
        &self,
        repo: &RepositoryIdentity,
        page: u32,
        per_page: u32,
    ) -> Result<Page<StarEvent>> {
        let url = self.endpoint(&["repos", &repo.owner, &repo.name, "stargazers"])?;

        let payload: Page<StargazerPayload> =
            self.get_page(url, STAR_MEDIA_TYPE, page, per_page).await?;

        Ok(Page {
            items: payload
                .items
                .into_iter()
                .map(|gazer| StarEvent::new(gazer.starred_at))
                .collect(),
            next_page: payload.next_page,
            last_page: payload.last_page,
        })
    }
}

/// Map a non-success response to an error, flagging exhausted rate limits
fn status_error(response: &Response, status: StatusCode) -> StarGraphError {
    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|remaining| remaining.trim() == "0");

    let message = if rate_limited
        && (status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS)
    {
        "GitHub API rate limit exceeded".to_string()
    } else {
        format!("GitHub API returned {}", status)
    };

    StarGraphError::remote_with_status(message, status.as_u16())
}

/// Pagination targets extracted from a `Link` header
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PageLinks {
    next: Option<u32>,
    last: Option<u32>,
}

/// Parse `<url?page=2>; rel="next", <url?page=5>; rel="last"`
fn parse_link_header(value: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for entry in value.split(',') {
        let mut parts = entry.split(';');
        let Some(target) = parts.next() else {
            continue;
        };
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let page = Url::parse(target).ok().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse::<u32>().ok())
        });

        for param in parts {
            let Some(rel) = param.trim().strip_prefix("rel=") else {
                continue;
            };
            for kind in rel.trim_matches('"').split_whitespace() {
                match kind {
                    "next" => links.next = page,
                    "last" => links.last = page,
                    _ => {}
                }
            }
        }
    }

    links
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    name: String,
    owner: OwnerPayload,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct StargazerPayload {
    starred_at: Timestamp,
}
