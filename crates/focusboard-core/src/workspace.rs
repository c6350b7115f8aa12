//! Signed-in context: ties an [`AuthProvider`] to the task and profile
//! stores.
//!
//! Sign-in flows run through the workspace so the stores are loaded with the
//! right defaults before anyone else reacts to the change. Changes made
//! directly on the provider are picked up by [`Workspace::follow_auth`].

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::auth::AuthProvider;
use crate::error::Result;
use crate::profile::{UserInfo, UserProfileStore};
use crate::store::TaskStore;

pub struct Workspace {
    auth: Arc<dyn AuthProvider>,
    tasks: Arc<TaskStore>,
    profiles: Arc<UserProfileStore>,
    /// Serializes user switches.
    switching: Mutex<()>,
}

impl Workspace {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        tasks: Arc<TaskStore>,
        profiles: Arc<UserProfileStore>,
    ) -> Self {
        Self {
            auth,
            tasks,
            profiles,
            switching: Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    pub fn tasks(&self) -> &Arc<TaskStore> {
        &self.tasks
    }

    pub fn profiles(&self) -> &Arc<UserProfileStore> {
        &self.profiles
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.auth.current_user_id()
    }

    /// Load the stores for whoever the provider says is signed in.
    pub async fn restore(&self) -> Result<Option<String>> {
        let _guard = self.switching.lock().await;
        let user_id = self.auth.current_user_id();
        self.switch_to(user_id.as_deref(), None).await?;
        Ok(user_id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let _guard = self.switching.lock().await;
        let user_id = self.auth.login(email, password).await?;
        self.switch_to(Some(&user_id), Some(email)).await?;
        Ok(user_id)
    }

    /// Create an account and sign it in. The new profile is named after the
    /// local part of the email.
    pub async fn register(&self, email: &str, password: &str) -> Result<String> {
        let _guard = self.switching.lock().await;
        let user_id = self.auth.register(email, password).await?;
        self.switch_to(Some(&user_id), Some(email)).await?;
        Ok(user_id)
    }

    pub async fn logout(&self) -> Result<()> {
        let _guard = self.switching.lock().await;
        self.auth.logout().await?;
        self.switch_to(None, None).await
    }

    /// Keep the stores on the provider's current user. Runs until the
    /// returned task is aborted.
    pub fn follow_auth(self: &Arc<Self>) -> JoinHandle<()> {
        let workspace = Arc::clone(self);
        let mut changes = self.auth.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let user_id = changes.borrow_and_update().clone();
                let _guard = workspace.switching.lock().await;
                if workspace.tasks.user_id() == user_id {
                    continue;
                }
                if let Err(e) = workspace.switch_to(user_id.as_deref(), None).await {
                    tracing::warn!(error = %e, "failed to load stores after sign-in change");
                }
            }
        })
    }

    async fn switch_to(&self, user_id: Option<&str>, email: Option<&str>) -> Result<()> {
        let Some(user_id) = user_id else {
            tracing::debug!("signed out, clearing stores");
            self.tasks.sign_out();
            self.profiles.sign_out();
            return Ok(());
        };

        tracing::debug!(user_id, "loading stores");
        let defaults = default_profile(user_id, email);
        let (tasks, profile) = tokio::join!(
            self.tasks.load(user_id),
            self.profiles.load(user_id, &defaults)
        );
        tasks?;
        profile?;
        Ok(())
    }
}

fn default_profile(user_id: &str, email: Option<&str>) -> UserInfo {
    let email = email.map(|e| e.trim().to_ascii_lowercase()).unwrap_or_default();
    let name = email.split('@').next().unwrap_or_default().to_string();
    UserInfo::with_defaults(user_id, name, email)
}
