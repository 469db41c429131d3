//! In-memory doubles for the identity provider and the user store

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

use super::models::{NewUserAccount, Role, UserAccount, UserAccountUpdate};
use super::verifier::{IdentityProvider, ProviderPayload, ProviderRejection};
use crate::common::generate_user_id;
use crate::storage::errors::{ErrorMeta, StorageError};
use crate::storage::UserStore;

/// Provider answering from a fixed token table
#[derive(Default)]
pub struct FakeIdentityProvider {
    answers: HashMap<String, Result<ProviderPayload, ProviderRejection>>,
    delay: Option<Duration>,
    audiences: Arc<Mutex<Vec<String>>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(
        mut self,
        token: &str,
        subject: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Self {
        self.answers.insert(
            token.to_string(),
            Ok(ProviderPayload {
                subject: subject.to_string(),
                email: email.map(str::to_string),
                name: name.map(str::to_string),
                picture: Some(format!("https://img/{}.png", subject)),
            }),
        );
        self
    }

    pub fn with_rejection(mut self, token: &str, rejection: ProviderRejection) -> Self {
        self.answers.insert(token.to_string(), Err(rejection));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Audiences seen by the provider, in call order
    pub fn audiences(&self) -> Arc<Mutex<Vec<String>>> {
        self.audiences.clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn verify_id_token(
        &self,
        token: &str,
        audience: &str,
    ) -> Result<ProviderPayload, ProviderRejection> {
        self.audiences.lock().unwrap().push(audience.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .get(token)
            .cloned()
            .unwrap_or(Err(ProviderRejection::Rejected { status: 400 }))
    }
}

/// User store enforcing the same uniqueness rules as the SQLite schema
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserAccount>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    lookups: AtomicUsize,
    create_failures: Mutex<Vec<StorageError>>,
    lookup_failures: Mutex<Vec<StorageError>>,
    lookup_barrier: Option<Arc<Barrier>>,
    gated_lookups: AtomicUsize,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `callers` email lookups read the table, then wait for each
    /// other before returning, so all of them observe the same snapshot.
    pub fn with_lookup_barrier(mut self, callers: usize) -> Self {
        self.lookup_barrier = Some(Arc::new(Barrier::new(callers)));
        self.gated_lookups = AtomicUsize::new(callers);
        self
    }

    pub fn fail_next_create(&self, err: StorageError) {
        self.create_failures.lock().unwrap().push(err);
    }

    pub fn fail_next_lookup(&self, err: StorageError) {
        self.lookup_failures.lock().unwrap().push(err);
    }

    /// Seeds an account directly, bypassing the create counter
    pub fn seed(&self, email: &str, subject: Option<&str>, avatar: Option<&str>) -> UserAccount {
        let now = Utc::now().to_rfc3339();
        let account = UserAccount {
            id: generate_user_id(),
            email: email.to_string(),
            external_subject_id: subject.map(str::to_string),
            display_name: "Existing User".to_string(),
            avatar_url: avatar.map(str::to_string),
            role: Role::Member,
            onboarded: true,
            created_at: now.clone(),
            updated_at: now,
        };
        self.users.lock().unwrap().push(account.clone());
        account
    }

    pub fn all(&self) -> Vec<UserAccount> {
        self.users.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn unique_violation(column: &str) -> StorageError {
        StorageError::Database {
            code: Some("2067".to_string()),
            message: format!("UNIQUE constraint failed: users.{}", column),
            meta: ErrorMeta {
                target: vec![column.to_string()],
                field_name: None,
            },
        }
    }

    fn take_failure(failures: &Mutex<Vec<StorageError>>) -> Option<StorageError> {
        failures.lock().unwrap().pop()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::take_failure(&self.lookup_failures) {
            return Err(err);
        }

        let found = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned();

        if let Some(barrier) = &self.lookup_barrier {
            let gated = self
                .gated_lookups
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if gated {
                barrier.wait().await;
            }
        }

        Ok(found)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, StorageError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn create(&self, fields: NewUserAccount) -> Result<UserAccount, StorageError> {
        if let Some(err) = Self::take_failure(&self.create_failures) {
            return Err(err);
        }

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == fields.email) {
            return Err(Self::unique_violation("email"));
        }
        if let Some(subject) = &fields.external_subject_id {
            if users
                .iter()
                .any(|u| u.external_subject_id.as_ref() == Some(subject))
            {
                return Err(Self::unique_violation("external_subject_id"));
            }
        }

        let now = Utc::now().to_rfc3339();
        let account = UserAccount {
            id: generate_user_id(),
            email: fields.email,
            external_subject_id: fields.external_subject_id,
            display_name: fields.display_name,
            avatar_url: fields.avatar_url,
            role: fields.role,
            onboarded: fields.onboarded,
            created_at: now.clone(),
            updated_at: now,
        };
        users.push(account.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(account)
    }

    async fn update_by_id(
        &self,
        id: &str,
        fields: UserAccountUpdate,
    ) -> Result<UserAccount, StorageError> {
        let mut users = self.users.lock().unwrap();
        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StorageError::RecordNotFound)?;

        if let Some(subject) = &fields.external_subject_id {
            if users[index].external_subject_id.is_some() {
                return Ok(users[index].clone());
            }
            if users
                .iter()
                .any(|u| u.external_subject_id.as_ref() == Some(subject))
            {
                return Err(Self::unique_violation("external_subject_id"));
            }
        }

        let account = &mut users[index];
        if let Some(subject) = fields.external_subject_id {
            account.external_subject_id = Some(subject);
        }
        if let Some(avatar) = fields.avatar_url {
            account.avatar_url = Some(avatar);
        }
        account.updated_at = Utc::now().to_rfc3339();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(account.clone())
    }
}
