//! Login entry point: verify an external identity token, then resolve the
//! local account it belongs to.

use tracing::info;

use super::models::UserAccount;
use super::resolver::AccountResolver;
use super::verifier::IdentityVerifier;
use crate::common::{safe_email_log, NormalizedError};

#[derive(Clone)]
pub struct LoginService {
    verifier: IdentityVerifier,
    resolver: AccountResolver,
}

impl LoginService {
    pub fn new(verifier: IdentityVerifier, resolver: AccountResolver) -> Self {
        Self { verifier, resolver }
    }

    pub async fn login_with_external_identity(
        &self,
        token: &str,
    ) -> Result<UserAccount, NormalizedError> {
        info!("Attempting Google login");
        let claims = self.verifier.verify(token).await?;
        let user = self.resolver.resolve_or_create(&claims).await?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "Google login successful"
        );
        Ok(user)
    }
}
