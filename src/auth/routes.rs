//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/google` - Google ID token login/signup
/// - `POST /api/auth/refresh` - Refresh the session token pair
/// - `GET /api/auth/me` - Get current user information
/// - `POST /api/auth/logout` - Logout (client-side token removal)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/google", post(handlers::google_login))
        .route("/api/auth/refresh", post(handlers::refresh_token))
        .route("/api/auth/me", get(handlers::me_handler))
        .route("/api/auth/logout", post(handlers::logout_handler))
}
