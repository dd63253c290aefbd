use std::sync::Arc;

use auth_adapters::BasicAuthenticator;
use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::Router;
use services::{AdvertService, ApplicationService};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics::BoardMetrics;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone, Copy)]
pub struct ListingSettings {
    pub per_page: u32,
    pub menu_limit: u32,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            per_page: 3,
            menu_limit: 3,
        }
    }
}

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub adverts: AdvertService,
    pub applications: ApplicationService,
    pub authenticator: Arc<BasicAuthenticator>,
    pub metrics: Arc<BoardMetrics>,
    pub listing: ListingSettings,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/advert", get(handlers::index))
        .route("/advert/{page}", get(handlers::index_page))
        .route("/advert/menu", get(handlers::menu))
        .route("/advert/view/{id}", get(handlers::view))
        .route("/advert/view/{id}/apply", post(handlers::apply))
        .route("/advert/add", get(handlers::add_form).post(handlers::add))
        .route("/advert/edit/{id}", get(handlers::edit_form).post(handlers::edit))
        .route(
            "/advert/delete/{id}",
            get(handlers::delete_form).post(handlers::delete),
        )
        .route("/application/{id}/withdraw", post(handlers::withdraw))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        .with_state(state)
}
