//! Application router assembly.
//!
//! [`build_app_router`] is shared by the binary and the integration tests so
//! both run behind the same gate and layer stack.

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, DATE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::Router;
use moduleab_core::signing::{API_KEY_HEADER, SIGNATURE_HEADER};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::middleware::gate;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the service router.
///
/// `/health` is public, `/api/v1/auth/login` is public, and everything else
/// under `/api/v1` passes through [`gate::authorize`] first. Outermost to
/// innermost, every request then sees: CORS, request id assignment, tracing,
/// request id propagation, the request timeout (which also bounds archive
/// vault lookups) and the panic catcher.
pub fn build_app_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", api_router(&state))
        // Innermost first.
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
        .layer(build_cors_layer(&config))
        .with_state(state)
}

/// The `/api/v1` tree: login in the clear, the rest behind the gate.
fn api_router(state: &AppState) -> Router<AppState> {
    let gated = routes::api_routes().route_layer(from_fn_with_state(state.clone(), gate::authorize));
    routes::auth::public_router().merge(gated)
}

/// CORS for the configured browser origins.
///
/// Signed clients send `Date`, `X-Api-Key` and `Signature`, so those are
/// allowed alongside the bearer header. An unparsable origin aborts startup.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{origin}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            DATE,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(SIGNATURE_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
