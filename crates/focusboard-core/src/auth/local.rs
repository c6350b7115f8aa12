//! Email/password auth over a [`CredentialStore`].
//!
//! Passwords are kept as salted SHA-256 digests. Repeated failures for the
//! same email lock it out for a short while.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use super::{normalize_email, Account, AuthProvider, CredentialStore, MIN_PASSWORD_LEN};
use crate::error::{AuthError, RepositoryError};

/// Consecutive failed logins before an email is locked out.
const MAX_FAILED_ATTEMPTS: u32 = 5;
/// Lockout length once the limit is hit.
const LOCKOUT_SECS: i64 = 60;

#[derive(Debug, Default)]
struct Attempts {
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// Auth provider backed by a credential store.
pub struct LocalAuth<S> {
    store: Arc<S>,
    current: watch::Sender<Option<String>>,
    attempts: Mutex<HashMap<String, Attempts>>,
}

impl<S: CredentialStore> LocalAuth<S> {
    /// Provider with nobody signed in.
    pub fn new(store: Arc<S>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            store,
            current,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Provider that picks up the sign-in persisted by an earlier run.
    pub async fn restore(store: Arc<S>) -> Result<Self, AuthError> {
        let active = store.active_user().await.map_err(storage_error)?;
        let auth = Self::new(store);
        auth.current.send_replace(active);
        Ok(auth)
    }

    fn check_lockout(&self, email: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        match attempts.get(email).and_then(|a| a.locked_until) {
            Some(until) if until > now => Err(AuthError::TooManyRequests),
            _ => Ok(()),
        }
    }

    fn record_failure(&self, email: &str, now: DateTime<Utc>) {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = attempts.entry(email.to_string()).or_default();
        if entry.locked_until.is_some_and(|until| until <= now) {
            *entry = Attempts::default();
        }
        entry.failures += 1;
        if entry.failures >= MAX_FAILED_ATTEMPTS {
            entry.locked_until = Some(now + Duration::seconds(LOCKOUT_SECS));
            tracing::warn!(email, "too many failed sign-ins, locking out");
        }
    }

    fn clear_failures(&self, email: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(email);
    }

    async fn activate(&self, user_id: &str) -> Result<(), AuthError> {
        self.store
            .set_active_user(Some(user_id))
            .await
            .map_err(storage_error)?;
        self.current.send_replace(Some(user_id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl<S: CredentialStore> AuthProvider for LocalAuth<S> {
    fn current_user_id(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.current.subscribe()
    }

    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email)?;
        let now = Utc::now();
        self.check_lockout(&email, now)?;

        let account = match self.store.find_account(&email).await.map_err(storage_error)? {
            Some(account) => account,
            None => {
                self.record_failure(&email, now);
                return Err(AuthError::UserNotFound);
            }
        };
        if digest(&account.salt, password) != account.password_digest {
            self.record_failure(&email, now);
            return Err(AuthError::WrongPassword);
        }

        self.clear_failures(&email);
        self.activate(&account.user_id).await?;
        tracing::info!(user_id = %account.user_id, "signed in");
        Ok(account.user_id)
    }

    async fn register(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min_len: MIN_PASSWORD_LEN,
            });
        }
        if self.store.find_account(&email).await.map_err(storage_error)?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let salt = hex::encode(rand::random::<[u8; 16]>());
        let account = Account {
            user_id: uuid::Uuid::new_v4().to_string(),
            email,
            password_digest: digest(&salt, password),
            salt,
            created_at: Utc::now(),
        };
        self.store
            .insert_account(&account)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailInUse,
                other => storage_error(other),
            })?;

        self.activate(&account.user_id).await?;
        tracing::info!(user_id = %account.user_id, "registered");
        Ok(account.user_id)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.store.set_active_user(None).await.map_err(storage_error)?;
        self.current.send_replace(None);
        Ok(())
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn storage_error(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Unavailable(msg) => AuthError::Network(msg),
        other => AuthError::Storage(other.to_string()),
    }
}
