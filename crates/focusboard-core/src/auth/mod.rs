//! Authentication contract.
//!
//! The core only needs to know who is signed in and to hear when that
//! changes. [`AuthProvider`] exposes both plus the email/password flows;
//! [`LocalAuth`] implements it over any [`CredentialStore`].

mod local;

pub use local::LocalAuth;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{AuthError, RepositoryError};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Stored credentials for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    /// Normalized (trimmed, lowercase) email
    pub email: String,
    /// Hex-encoded random salt
    pub salt: String,
    /// Hex-encoded SHA-256 of salt followed by password
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence for accounts and the signed-in user.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_account(&self, email: &str) -> Result<Option<Account>, RepositoryError>;

    /// Store a new account. Fails with [`RepositoryError::Conflict`] when the
    /// email is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), RepositoryError>;

    /// User id of the persisted sign-in, if any.
    async fn active_user(&self) -> Result<Option<String>, RepositoryError>;

    async fn set_active_user(&self, user_id: Option<&str>) -> Result<(), RepositoryError>;
}

/// Sign-in state and flows.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Currently signed-in user id.
    fn current_user_id(&self) -> Option<String>;

    /// Change stream of the signed-in user id. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<String>>;

    /// Sign in and return the user id.
    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Create an account, sign it in and return the new user id.
    async fn register(&self, email: &str, password: &str) -> Result<String, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}

/// Trim and lowercase an email, rejecting obviously malformed ones.
pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;
    let domain_ok = domain
        .split('.')
        .filter(|part| !part.is_empty())
        .count()
        >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || domain.contains('@') || !domain_ok || email.contains(char::is_whitespace)
    {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}
