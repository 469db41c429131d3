//! Session boundary: issues and validates the local session tokens handed
//! out after a successful login.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{error, warn};

use super::models::{Claims, SessionTokens, TokenType, UserAccount};
use crate::common::config::SessionConfig;
use crate::common::NormalizedError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("expected a {expected:?} token")]
    WrongType { expected: TokenType },
}

impl From<SessionError> for NormalizedError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Encoding(e) => {
                error!(error = %e, "JWT encoding error");
                NormalizedError::internal("Could not create session")
            }
            SessionError::Invalid(e) => {
                warn!(error = %e, "JWT token validation failed");
                NormalizedError::unauthorized("Invalid token")
            }
            SessionError::WrongType { expected } => {
                warn!(expected = ?expected, "JWT token of the wrong type presented");
                NormalizedError::unauthorized("Invalid token")
            }
        }
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    config: SessionConfig,
}

impl SessionIssuer {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Issue an access/refresh token pair for `user`
    pub fn issue(&self, user: &UserAccount) -> Result<SessionTokens, SessionError> {
        let token = self.sign(&user.id, TokenType::Access)?;
        let refresh_token = self.sign(&user.id, TokenType::Refresh)?;
        Ok(SessionTokens {
            token,
            refresh_token,
            expires_in: self.config.access_ttl.num_seconds(),
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, SessionError> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, SessionError> {
        self.verify(token, TokenType::Refresh)
    }

    fn secret(&self, typ: TokenType) -> &[u8] {
        match typ {
            TokenType::Access => self.config.access_secret.as_bytes(),
            TokenType::Refresh => self.config.refresh_secret.as_bytes(),
        }
    }

    fn sign(&self, user_id: &str, typ: TokenType) -> Result<String, SessionError> {
        let ttl = match typ {
            TokenType::Access => self.config.access_ttl,
            TokenType::Refresh => self.config.refresh_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
            typ,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(typ)),
        )
        .map_err(SessionError::Encoding)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, SessionError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(expected)),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(SessionError::Invalid)?;

        if data.claims.typ != expected {
            return Err(SessionError::WrongType { expected });
        }
        Ok(data.claims)
    }
}
