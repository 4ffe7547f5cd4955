//! # Stargraph Server
//!
//! HTTP boundary serving stargazer history charts as SVG.

pub mod routes;
pub mod state;

pub use routes::{create_router, StarsQuery, CACHE_CONTROL_VALUE, CACHE_HIT_HEADER};
pub use state::{AppState, RenderedChart, ResponseCache};
