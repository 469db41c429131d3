//! Authentication handlers

use axum::extract::{rejection::JsonRejection, Extension, Json};
use std::sync::Arc;
use tracing::{info, warn};

use super::extractors::AuthedUser;
use super::models::{GoogleLoginRequest, LoginResponse, RefreshTokenRequest, SessionTokens, UserAccount};
use super::validators::{GoogleLoginValidator, RefreshTokenValidator};
use crate::common::{AppState, NormalizedError, Validator};
use crate::storage::classify;

/// POST /api/auth/google
/// Logs in (or signs up) with a Google ID token
///
/// # Request Body
/// ```json
/// { "id_token": "<google id token>" }
/// ```
///
/// # Response
/// ```json
/// { "token": "<jwt>", "refresh_token": "<jwt>", "expires_in": 3600, "user": { ... } }
/// ```
pub async fn google_login(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, NormalizedError> {
    let Json(payload) = payload.map_err(reject_body)?;
    GoogleLoginValidator.validate(&payload).into_result()?;

    let user = state
        .login
        .login_with_external_identity(payload.id_token.trim())
        .await?;
    let tokens = state.sessions.issue(&user)?;

    Ok(Json(LoginResponse { tokens, user }))
}

/// POST /api/auth/refresh
/// Exchanges a refresh token for a new token pair
pub async fn refresh_token(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<SessionTokens>, NormalizedError> {
    let Json(payload) = payload.map_err(reject_body)?;
    RefreshTokenValidator.validate(&payload).into_result()?;

    let claims = state.sessions.verify_refresh(payload.refresh_token.trim())?;
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await
        .map_err(|e| classify(e, "load user for token refresh"))?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "Refresh token for unknown user");
            NormalizedError::unauthorized("User not found")
        })?;

    info!(user_id = %user.id, "Session refreshed");
    Ok(Json(state.sessions.issue(&user)?))
}

/// GET /api/auth/me
/// Returns the current authenticated user
pub async fn me_handler(AuthedUser(user): AuthedUser) -> Json<UserAccount> {
    Json(user)
}

/// POST /api/auth/logout
/// Tokens are stateless, so logout is handled client-side; this only
/// acknowledges the request
pub async fn logout_handler(AuthedUser(user): AuthedUser) -> Json<serde_json::Value> {
    info!(user_id = %user.id, "User logout successful");
    Json(serde_json::json!({
        "message": "Logout successful"
    }))
}

fn reject_body(rejection: JsonRejection) -> NormalizedError {
    warn!(
        status = %rejection.status(),
        reason = %rejection.body_text(),
        "Rejected request body"
    );
    NormalizedError::bad_request("Invalid request body")
}
