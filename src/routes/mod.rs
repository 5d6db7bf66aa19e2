//! Route modules for the OCR PDF server

pub mod health;
pub mod ocr;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_api_key;
use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload = state.config().pipeline.max_upload_bytes;

    let ocr_routes = Router::new()
        .route("/ocr-pdf", post(ocr::ocr_pdf))
        .route_layer(middleware::from_fn_with_state(
            state.gate().clone(),
            require_api_key,
        ))
        .layer(DefaultBodyLimit::max(max_upload));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(ocr_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
