//! Account resolution: reconcile verified identity claims with local
//! accounts.
//!
//! The steps run in a fixed order:
//! 1. look the account up by email
//! 2. create it when absent
//! 3. return it unchanged when it is already linked to a provider subject
//! 4. link it (attach the subject id, fill a missing avatar) otherwise
//!
//! Linking is one-way; a subject id, once set, is never cleared or
//! replaced here. Concurrent first logins for the same email are settled by
//! the unique email constraint: the losing insert sees a conflict and the
//! lookup is repeated exactly once.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::{
    NewUserAccount, Role, TrustedIdentityClaims, UserAccount, UserAccountUpdate,
    DEFAULT_DISPLAY_NAME,
};
use crate::common::{safe_email_log, NormalizedError};
use crate::storage::{classify, UserStore};

#[derive(Clone)]
pub struct AccountResolver {
    store: Arc<dyn UserStore>,
}

impl AccountResolver {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn resolve_or_create(
        &self,
        claims: &TrustedIdentityClaims,
    ) -> Result<UserAccount, NormalizedError> {
        if let Some(existing) = self.find_by_email(claims).await? {
            return self.reconcile_existing(existing, claims).await;
        }

        match self.create(claims).await {
            Ok(created) => Ok(created),
            Err(conflict) if conflict.is_conflict() => {
                warn!(
                    email = %safe_email_log(&claims.email),
                    "Account creation lost a race, retrying lookup once"
                );
                match self.find_by_email(claims).await? {
                    Some(winner) => self.reconcile_existing(winner, claims).await,
                    None => Err(conflict),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn find_by_email(
        &self,
        claims: &TrustedIdentityClaims,
    ) -> Result<Option<UserAccount>, NormalizedError> {
        self.store
            .find_by_email(&claims.email)
            .await
            .map_err(|e| classify(e, "find user by email"))
    }

    async fn create(&self, claims: &TrustedIdentityClaims) -> Result<UserAccount, NormalizedError> {
        info!(
            email = %safe_email_log(&claims.email),
            provider_id = %claims.subject_id,
            "Creating new user from external identity"
        );

        let fields = NewUserAccount {
            email: claims.email.clone(),
            external_subject_id: Some(claims.subject_id.clone()),
            display_name: claims
                .display_name
                .clone()
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            avatar_url: claims.avatar_url.clone(),
            role: Role::Guest,
            onboarded: false,
        };

        self.store
            .create(fields)
            .await
            .map_err(|e| classify(e, "create user from external identity"))
    }

    async fn reconcile_existing(
        &self,
        existing: UserAccount,
        claims: &TrustedIdentityClaims,
    ) -> Result<UserAccount, NormalizedError> {
        if let Some(linked_subject) = &existing.external_subject_id {
            if linked_subject != &claims.subject_id {
                warn!(
                    user_id = %existing.id,
                    linked_provider_id = %linked_subject,
                    provider_id = %claims.subject_id,
                    "Login for linked account carries a different subject id, keeping the linked one"
                );
            } else {
                debug!(user_id = %existing.id, "Repeat login for linked account");
            }
            return Ok(existing);
        }

        info!(
            user_id = %existing.id,
            provider_id = %claims.subject_id,
            "Linking external identity to existing user"
        );

        let avatar_url = if existing.has_avatar() {
            None
        } else {
            claims.avatar_url.clone()
        };

        let linked = self
            .store
            .update_by_id(
                &existing.id,
                UserAccountUpdate {
                    external_subject_id: Some(claims.subject_id.clone()),
                    avatar_url,
                },
            )
            .await
            .map_err(|e| classify(e, "link external identity to user"))?;

        if linked.external_subject_id.as_deref() != Some(claims.subject_id.as_str()) {
            warn!(
                user_id = %linked.id,
                provider_id = %claims.subject_id,
                "Account was linked by a concurrent login, keeping the existing link"
            );
        }
        Ok(linked)
    }
}
