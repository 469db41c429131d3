// src/app.rs
//! Router composition

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::common::AppState;
use crate::{auth, health, logging_middleware, security_middleware};

pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true);

    Router::new()
        .merge(auth::auth_routes())
        .merge(health::health_routes())
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(middleware::from_fn(security_middleware::security_headers))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
