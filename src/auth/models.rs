//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder display name for identities that carry no name claim
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// Account role; only `Guest` is assigned by the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Member,
    Admin,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub external_subject_id: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub onboarded: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserAccount {
    pub fn has_avatar(&self) -> bool {
        self.avatar_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Fields for a new account; the store assigns `id` and timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserAccount {
    pub email: String,
    pub external_subject_id: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub onboarded: bool,
}

/// Partial update; `None` leaves the column as it is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccountUpdate {
    pub external_subject_id: Option<String>,
    pub avatar_url: Option<String>,
}

/// Attributes of a verified third-party identity. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedIdentityClaims {
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Distinguishes the two session token kinds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub typ: TokenType,
}

/// Google ID token payload for login
#[derive(Deserialize, Debug)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub id_token: String,
}

#[derive(Deserialize, Debug)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Token pair returned after login or refresh
#[derive(Serialize, Debug, Clone)]
pub struct SessionTokens {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: SessionTokens,
    pub user: UserAccount,
}
