//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::UserAccount;
use crate::common::{safe_email_log, AppState, NormalizedError};
use crate::storage::classify;

/// Authenticated user extractor
///
/// Validates the Bearer access token and loads the account it names.
#[derive(Debug)]
pub struct AuthedUser(pub UserAccount);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = NormalizedError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| NormalizedError::internal("missing app state"))?;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let Some(header) = header else {
            warn!("Authentication failed: missing Authorization header");
            return Err(NormalizedError::unauthorized("Missing authorization"));
        };

        let Some(bare_token) = header.strip_prefix("Bearer ").map(str::trim) else {
            warn!("Authentication failed: Authorization header is not a Bearer token");
            return Err(NormalizedError::unauthorized("Missing authorization"));
        };

        let claims = app_state.sessions.verify_access(bare_token)?;

        let user = app_state
            .users
            .find_by_id(&claims.sub)
            .await
            .map_err(|e| classify(e, "load authenticated user"))?;

        match user {
            Some(u) => {
                debug!(
                    user_id = %u.id,
                    email = %safe_email_log(&u.email),
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser(u))
            }
            None => {
                warn!(user_id = %claims.sub, "Authentication failed: user not found in database");
                Err(NormalizedError::unauthorized("User not found"))
            }
        }
    }
}
