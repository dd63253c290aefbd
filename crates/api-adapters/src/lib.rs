//! # api-adapters
//!
//! The HTML front of the advert board: askama views, business metrics and,
//! with `web-axum`, the router and its handlers.

pub mod metrics;
pub mod views;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
mod router;

pub use metrics::BoardMetrics;

#[cfg(feature = "web-axum")]
pub use router::{build_router, AppState, ListingSettings};
