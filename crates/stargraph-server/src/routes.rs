//! HTTP routes for stargazer charts
//!
//! `GET /stars.svg?user=&repo=` renders the star history of one repository,
//! or of every repository owned by `user` when `repo` is absent.

use crate::state::{AppState, RenderedChart};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use stargraph_common::{RepositoryIdentity, Result};
use stargraph_graphs::build_series;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// One day, matching the lifetime of cached responses
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

/// Header telling whether the chart came from the response cache
pub const CACHE_HIT_HEADER: &str = "cache-hit";

/// Query parameters of the chart endpoint
#[derive(Debug, Deserialize)]
pub struct StarsQuery {
    pub user: Option<String>,
    pub repo: Option<String>,
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stars.svg", get(stars_svg))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn stars_svg(State(state): State<AppState>, Query(query): Query<StarsQuery>) -> Response {
    let Some(user) = non_empty(query.user) else {
        return (
            StatusCode::BAD_REQUEST,
            "missing required query parameter: user",
        )
            .into_response();
    };
    let repo = non_empty(query.repo);
    let key = format!("svg/{}/{}", user, repo.as_deref().unwrap_or_default());
    let content_type = state.renderer.content_type();

    if let Some(chart) = state.responses.get(&key).await {
        debug!("Serving {} from response cache", key);
        return chart_response(content_type, chart.0, true);
    }

    // Dropped when the client goes away, cancelling every nested fetch
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();

    match render_chart(&state, &user, repo.as_deref(), &token).await {
        Ok(body) => {
            info!("Rendered {} ({} bytes)", key, body.len());
            state
                .responses
                .set(key, RenderedChart(body.clone()), state.response_ttl)
                .await;
            chart_response(content_type, body, false)
        }
        Err(err) => {
            error!("Failed to render {}: {}", key, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn render_chart(
    state: &AppState,
    user: &str,
    repo: Option<&str>,
    token: &CancellationToken,
) -> Result<Bytes> {
    let events = match repo {
        Some(name) => {
            state
                .collector
                .list_stargazers(&RepositoryIdentity::new(user, name), token)
                .await?
        }
        None => state.collector.list_all_stargazers(user, token).await?,
    };

    let series = build_series(&events, Utc::now());
    let rendered = state.renderer.render(&series).await?;
    Ok(Bytes::from(rendered))
}

fn chart_response(content_type: &'static str, body: Bytes, hit: bool) -> Response {
    let hit = if hit { "hit" } else { "miss" };
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE),
            (HeaderName::from_static(CACHE_HIT_HEADER), hit),
        ],
        body,
    )
        .into_response()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
