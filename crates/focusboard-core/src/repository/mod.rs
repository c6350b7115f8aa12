//! Contracts the core needs from the remote store.
//!
//! The store itself (its protocol, its documents) lives outside the core.
//! Everything is keyed by opaque string ids and every call either succeeds
//! or fails with a [`RepositoryError`]. Two backends ship with the crate:
//! [`MemoryBackend`] for tests and embedding, and [`SqliteBackend`] for
//! on-disk use.

mod memory;
mod sqlite;

pub use memory::{MemoryBackend, RepoOp, SessionLog};
pub use sqlite::SqliteBackend;

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::profile::{CognitivePrefsPatch, UserInfo, UserInfoPatch};
use crate::task::{NewTask, OrderUpdate, Task, TaskPatch};
use crate::timer::Phase;

/// Task documents.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks owned by `user_id`, in no particular order.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Task>, RepositoryError>;

    /// Persist a new task and return it with its store-assigned id and
    /// creation time.
    async fn create(&self, user_id: &str, task: NewTask) -> Result<Task, RepositoryError>;

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<(), RepositoryError>;

    /// Record one more completed pomodoro. `current` is the count the
    /// caller saw before incrementing; the store writes `current + 1`.
    async fn increment_pomodoros(&self, id: &str, current: u32) -> Result<(), RepositoryError> {
        let patch = TaskPatch {
            completed_pomodoros: Some(current.saturating_add(1)),
            ..TaskPatch::default()
        };
        self.update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Apply every order change or none of them.
    async fn batch_update_order(&self, updates: &[OrderUpdate]) -> Result<(), RepositoryError>;
}

/// Pomodoro session records. Write-only from the core's point of view.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Open a record and return its id.
    async fn start_session(
        &self,
        user_id: &str,
        task_id: &str,
        phase: Phase,
    ) -> Result<String, RepositoryError>;

    async fn complete_session(
        &self,
        session_id: &str,
        duration_min: u32,
    ) -> Result<(), RepositoryError>;
}

/// Per-user info and preferences.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Existing record for `user_id`, or `defaults` after storing it.
    async fn get_or_create(
        &self,
        user_id: &str,
        defaults: &UserInfo,
    ) -> Result<UserInfo, RepositoryError>;

    /// Merge `patch` into the stored preferences. A missing user is not an
    /// error; there is nothing to update.
    async fn update_cognitive_prefs(
        &self,
        user_id: &str,
        patch: &CognitivePrefsPatch,
    ) -> Result<(), RepositoryError>;

    async fn update_user_info(
        &self,
        user_id: &str,
        patch: &UserInfoPatch,
    ) -> Result<(), RepositoryError>;
}
