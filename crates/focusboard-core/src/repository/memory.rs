//! In-process backend implementing every repository contract.
//!
//! Besides plain storage it can be told to fail an operation, to hold an
//! operation until released, and it counts calls per operation. That makes
//! it the backend of choice for exercising the optimistic store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

use super::{SessionRepository, TaskRepository, UserRepository};
use crate::auth::{Account, CredentialStore};
use crate::error::RepositoryError;
use crate::profile::{CognitivePrefsPatch, UserInfo, UserInfoPatch};
use crate::task::{NewTask, OrderUpdate, Task, TaskPatch};
use crate::timer::Phase;

/// Repository operations that can be counted, failed or held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    BatchOrder,
    StartSession,
    CompleteSession,
    GetOrCreateUser,
    UpdatePrefs,
    UpdateUser,
}

/// A stored pomodoro session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_min: u32,
    pub completed: bool,
}

#[derive(Default)]
struct Data {
    tasks: Vec<Task>,
    sessions: Vec<SessionLog>,
    users: HashMap<String, UserInfo>,
    accounts: HashMap<String, Account>,
    active_user: Option<String>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryBackend {
    data: tokio::sync::Mutex<Data>,
    failing: Mutex<HashSet<RepoOp>>,
    held: Mutex<HashMap<RepoOp, Arc<Semaphore>>>,
    calls: Mutex<HashMap<RepoOp, u64>>,
    next_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call of `op` fail until [`heal`](Self::heal).
    pub fn fail(&self, op: RepoOp) {
        lock(&self.failing).insert(op);
    }

    pub fn heal(&self, op: RepoOp) {
        lock(&self.failing).remove(&op);
    }

    /// Block every following call of `op` until [`release`](Self::release).
    pub fn hold(&self, op: RepoOp) {
        lock(&self.held).insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let held calls of `op` through. Whether they fail is decided after
    /// release.
    pub fn release(&self, op: RepoOp) {
        if let Some(gate) = lock(&self.held).remove(&op) {
            gate.close();
        }
    }

    /// Number of calls of `op` so far, including failed and held ones.
    pub fn calls(&self, op: RepoOp) -> u64 {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Insert a task as-is, bypassing id assignment.
    pub async fn seed_task(&self, task: Task) {
        self.data.lock().await.tasks.push(task);
    }

    /// Stored tasks of `user_id` in insertion order.
    pub async fn stored_tasks(&self, user_id: &str) -> Vec<Task> {
        self.data
            .lock()
            .await
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn stored_task(&self, id: &str) -> Option<Task> {
        self.data.lock().await.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub async fn sessions(&self) -> Vec<SessionLog> {
        self.data.lock().await.sessions.clone()
    }

    pub async fn stored_user(&self, user_id: &str) -> Option<UserInfo> {
        self.data.lock().await.users.get(user_id).cloned()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    /// Count the call, wait while held, then fail if told to.
    async fn enter(&self, op: RepoOp) -> Result<(), RepositoryError> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        let gate = lock(&self.held).get(&op).cloned();
        if let Some(gate) = gate {
            // Closing the semaphore is the release signal.
            let _ = gate.acquire().await;
        }
        if lock(&self.failing).contains(&op) {
            return Err(RepositoryError::Unavailable(format!("{op:?} failed")));
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl TaskRepository for MemoryBackend {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Task>, RepositoryError> {
        self.enter(RepoOp::ListTasks).await?;
        Ok(self.stored_tasks(user_id).await)
    }

    async fn create(&self, user_id: &str, task: NewTask) -> Result<Task, RepositoryError> {
        self.enter(RepoOp::CreateTask).await?;
        let task = task.into_task(self.next_id("task"), user_id.to_string(), Utc::now());
        self.data.lock().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<(), RepositoryError> {
        self.enter(RepoOp::UpdateTask).await?;
        let mut data = self.data.lock().await;
        let task = data
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        patch.apply_to(task);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.enter(RepoOp::DeleteTask).await?;
        let mut data = self.data.lock().await;
        let before = data.tasks.len();
        data.tasks.retain(|t| t.id != id);
        if data.tasks.len() == before {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn batch_update_order(&self, updates: &[OrderUpdate]) -> Result<(), RepositoryError> {
        self.enter(RepoOp::BatchOrder).await?;
        let mut data = self.data.lock().await;
        if let Some(missing) = updates
            .iter()
            .find(|u| !data.tasks.iter().any(|t| t.id == u.id))
        {
            return Err(RepositoryError::NotFound(missing.id.clone()));
        }
        for update in updates {
            if let Some(task) = data.tasks.iter_mut().find(|t| t.id == update.id) {
                task.order = update.order;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryBackend {
    async fn start_session(
        &self,
        user_id: &str,
        task_id: &str,
        phase: Phase,
    ) -> Result<String, RepositoryError> {
        self.enter(RepoOp::StartSession).await?;
        let id = self.next_id("session");
        self.data.lock().await.sessions.push(SessionLog {
            id: id.clone(),
            user_id: user_id.to_string(),
            task_id: task_id.to_string(),
            phase,
            started_at: Utc::now(),
            ended_at: None,
            duration_min: 0,
            completed: false,
        });
        Ok(id)
    }

    async fn complete_session(
        &self,
        session_id: &str,
        duration_min: u32,
    ) -> Result<(), RepositoryError> {
        self.enter(RepoOp::CompleteSession).await?;
        let mut data = self.data.lock().await;
        let session = data
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| RepositoryError::NotFound(session_id.to_string()))?;
        session.ended_at = Some(Utc::now());
        session.duration_min = duration_min;
        session.completed = true;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryBackend {
    async fn get_or_create(
        &self,
        user_id: &str,
        defaults: &UserInfo,
    ) -> Result<UserInfo, RepositoryError> {
        self.enter(RepoOp::GetOrCreateUser).await?;
        let mut data = self.data.lock().await;
        let info = data.users.entry(user_id.to_string()).or_insert_with(|| {
            let mut info = defaults.clone();
            info.id = user_id.to_string();
            info
        });
        Ok(info.clone())
    }

    async fn update_cognitive_prefs(
        &self,
        user_id: &str,
        patch: &CognitivePrefsPatch,
    ) -> Result<(), RepositoryError> {
        self.enter(RepoOp::UpdatePrefs).await?;
        if let Some(info) = self.data.lock().await.users.get_mut(user_id) {
            info.cognitive_preferences.apply(patch);
        }
        Ok(())
    }

    async fn update_user_info(
        &self,
        user_id: &str,
        patch: &UserInfoPatch,
    ) -> Result<(), RepositoryError> {
        self.enter(RepoOp::UpdateUser).await?;
        let mut data = self.data.lock().await;
        let info = data
            .users
            .get_mut(user_id)
            .ok_or_else(|| RepositoryError::NotFound(user_id.to_string()))?;
        patch.apply_to(info);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryBackend {
    async fn find_account(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        Ok(self.data.lock().await.accounts.get(email).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        if data.accounts.contains_key(&account.email) {
            return Err(RepositoryError::Conflict(account.email.clone()));
        }
        data.accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn active_user(&self) -> Result<Option<String>, RepositoryError> {
        Ok(self.data.lock().await.active_user.clone())
    }

    async fn set_active_user(&self, user_id: Option<&str>) -> Result<(), RepositoryError> {
        self.data.lock().await.active_user = user_id.map(String::from);
        Ok(())
    }
}
