//! External identity verification
//!
//! Validity of an identity token is decided entirely by the issuing
//! provider. Every way verification can go wrong (bad token, expired
//! token, audience mismatch, provider unreachable, timeout, missing email)
//! ends in the same [`VerificationFailure`]; the reason is only logged.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::models::TrustedIdentityClaims;
use crate::common::{safe_email_log, safe_token_log, NormalizedError};

/// Issuers accepted on Google ID tokens
const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Payload of a token the provider accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPayload {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderRejection {
    #[error("token rejected by provider (HTTP {status})")]
    Rejected { status: u16 },

    #[error("malformed verification response: {0}")]
    Malformed(String),

    #[error("token audience mismatch")]
    AudienceMismatch,

    #[error("untrusted token issuer: {0}")]
    UntrustedIssuer(String),

    #[error("token has expired")]
    Expired,

    #[error("verification service unreachable: {0}")]
    Unreachable(String),
}

/// Verification service of the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(
        &self,
        token: &str,
        audience: &str,
    ) -> Result<ProviderPayload, ProviderRejection>;
}

/// The identity token could not be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid identity token")]
pub struct VerificationFailure;

impl From<VerificationFailure> for NormalizedError {
    fn from(_: VerificationFailure) -> Self {
        NormalizedError::bad_request("Invalid identity token")
    }
}

/// Verifies identity tokens against a provider, bounded by a timeout
#[derive(Clone)]
pub struct IdentityVerifier {
    provider: Arc<dyn IdentityProvider>,
    audience: String,
    timeout: Duration,
}

impl IdentityVerifier {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        audience: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            audience: audience.into(),
            timeout,
        }
    }

    pub async fn verify(&self, token: &str) -> Result<TrustedIdentityClaims, VerificationFailure> {
        debug!(token = %safe_token_log(token), "Verifying identity token with provider");

        let outcome = tokio::time::timeout(
            self.timeout,
            self.provider.verify_id_token(token, &self.audience),
        )
        .await;

        let payload = match outcome {
            Ok(Ok(payload)) => payload,
            Ok(Err(rejection)) => {
                warn!(
                    reason = %rejection,
                    token = %safe_token_log(token),
                    "Identity token verification failed"
                );
                return Err(VerificationFailure);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    token = %safe_token_log(token),
                    "Identity token verification timed out"
                );
                return Err(VerificationFailure);
            }
        };

        if payload.subject.trim().is_empty() {
            warn!("Verified identity token carries no subject");
            return Err(VerificationFailure);
        }

        let Some(email) = non_empty(payload.email) else {
            warn!(
                provider_id = %payload.subject,
                "Verified identity token carries no email"
            );
            return Err(VerificationFailure);
        };

        debug!(
            email = %safe_email_log(&email),
            provider_id = %payload.subject,
            "Identity token verified"
        );

        Ok(TrustedIdentityClaims {
            subject_id: payload.subject,
            email,
            display_name: non_empty(payload.name),
            avatar_url: non_empty(payload.picture),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Response body of Google's tokeninfo endpoint
#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    aud: Option<String>,
    iss: Option<String>,
    exp: Option<Value>,
    email_verified: Option<Value>,
}

/// Verifies Google ID tokens with the tokeninfo endpoint
/// Docs: https://developers.google.com/identity/sign-in/web/backend-auth
pub struct GoogleTokenInfoProvider {
    http: Client,
    tokeninfo_url: String,
}

impl GoogleTokenInfoProvider {
    pub fn new(http: Client, tokeninfo_url: impl Into<String>) -> Self {
        Self {
            http,
            tokeninfo_url: tokeninfo_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleTokenInfoProvider {
    async fn verify_id_token(
        &self,
        token: &str,
        audience: &str,
    ) -> Result<ProviderPayload, ProviderRejection> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| ProviderRejection::Unreachable(e.to_string()))?;

        let status = response.status();
        debug!(http_status = %status, "Received response from Google tokeninfo endpoint");
        if !status.is_success() {
            return Err(ProviderRejection::Rejected {
                status: status.as_u16(),
            });
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| ProviderRejection::Malformed(e.to_string()))?;

        check_token_info(info, audience, Utc::now().timestamp())
    }
}

fn check_token_info(
    info: TokenInfo,
    audience: &str,
    now: i64,
) -> Result<ProviderPayload, ProviderRejection> {
    if info.aud.as_deref() != Some(audience) {
        return Err(ProviderRejection::AudienceMismatch);
    }

    let issuer = info.iss.unwrap_or_default();
    if !GOOGLE_ISSUERS.contains(&issuer.as_str()) {
        return Err(ProviderRejection::UntrustedIssuer(issuer));
    }

    let exp = info
        .exp
        .as_ref()
        .and_then(as_i64)
        .ok_or_else(|| ProviderRejection::Malformed("missing exp".to_string()))?;
    if exp <= now {
        return Err(ProviderRejection::Expired);
    }

    let subject = info
        .sub
        .ok_or_else(|| ProviderRejection::Malformed("missing sub".to_string()))?;

    if info.email_verified.as_ref().and_then(as_bool) == Some(false) {
        warn!(provider_id = %subject, "Google token contains unverified email address");
    }

    Ok(ProviderPayload {
        subject,
        email: info.email,
        name: info.name,
        picture: info.picture,
    })
}

// tokeninfo encodes numbers and booleans as strings
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
