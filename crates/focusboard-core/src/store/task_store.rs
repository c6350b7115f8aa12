//! Optimistic task list of the signed-in user.
//!
//! Every mutation changes the local list before its first `.await` and then
//! writes through to the [`TaskRepository`]. How a failed write is repaired
//! depends on the operation:
//!
//! | operation                                  | on remote failure           |
//! |--------------------------------------------|-----------------------------|
//! | create                                     | temporary entry removed     |
//! | delete                                     | pre-delete snapshot restored|
//! | move, edit, reorder, increment, subtasks   | full reload from the store  |
//!
//! A generation counter ties in-flight calls to the session that issued
//! them. Signing out or switching user bumps it, and late results for the
//! old session leave the list alone.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Recovery, TaskSyncError, ValidationError};
use crate::repository::TaskRepository;
use crate::task::{
    sort_for_board, NewTask, OrderUpdate, Subtask, Task, TaskPatch, TaskStatus,
    PROVISIONAL_ID_PREFIX,
};

#[derive(Default)]
struct StoreState {
    user_id: Option<String>,
    generation: u64,
    tasks: Vec<Task>,
}

impl StoreState {
    fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Task, TaskSyncError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskSyncError::UnknownTask(id.to_string()))
    }
}

/// In-memory authoritative task list with write-through to a repository.
pub struct TaskStore {
    repo: Arc<dyn TaskRepository>,
    state: Mutex<StoreState>,
    temp_seq: AtomicU64,
}

impl TaskStore {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self {
            repo,
            state: Mutex::new(StoreState::default()),
            temp_seq: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the list in its current local order.
    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state().find(id).cloned()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state().user_id.clone()
    }

    /// Replace the list with the tasks of `user_id`, sorted for the board.
    ///
    /// Switching to another user clears the list first. On failure the list
    /// is left as it was.
    pub async fn load(&self, user_id: &str) -> Result<(), TaskSyncError> {
        let generation = {
            let mut state = self.state();
            if state.user_id.as_deref() != Some(user_id) {
                state.generation += 1;
                state.user_id = Some(user_id.to_string());
                state.tasks.clear();
            }
            state.generation
        };

        let mut tasks = match self.repo.list_by_user(user_id).await {
            Ok(tasks) => tasks,
            Err(source) => {
                tracing::warn!(user_id, error = %source, "failed to load tasks");
                return Err(TaskSyncError::Load { source });
            }
        };
        sort_for_board(&mut tasks);

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(user_id, "discarding task load for previous session");
            return Ok(());
        }
        tracing::debug!(user_id, count = tasks.len(), "tasks loaded");
        state.tasks = tasks;
        Ok(())
    }

    /// Drop the list and end the session. Pending results for it are
    /// ignored.
    pub fn sign_out(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.user_id = None;
        state.tasks.clear();
    }

    fn next_temp_id(&self) -> String {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{PROVISIONAL_ID_PREFIX}{}-{seq}",
            Utc::now().timestamp_millis()
        )
    }

    /// Append a temporary task, create it remotely and swap in the confirmed
    /// record.
    ///
    /// Returns the confirmed task. On failure the temporary entry is gone and
    /// the caller decides whether to offer the input again.
    pub async fn create(&self, task: NewTask) -> Result<Task, TaskSyncError> {
        let task = task.validated()?;
        let temp_id = self.next_temp_id();
        let (user_id, generation) = {
            let mut state = self.state();
            let user_id = state.user_id.clone().ok_or(TaskSyncError::NotSignedIn)?;
            let temp = task
                .clone()
                .into_task(temp_id.clone(), user_id.clone(), Utc::now());
            state.tasks.push(temp);
            (user_id, state.generation)
        };
        tracing::debug!(%temp_id, "task created locally");

        match self.repo.create(&user_id, task).await {
            Ok(confirmed) => {
                let mut state = self.state();
                if state.generation != generation {
                    return Ok(confirmed);
                }
                let already_present = state.tasks.iter().any(|t| t.id == confirmed.id);
                match state.tasks.iter().position(|t| t.id == temp_id) {
                    Some(idx) if already_present => {
                        state.tasks.remove(idx);
                    }
                    Some(idx) => state.tasks[idx] = confirmed.clone(),
                    // Removed locally while in flight; keep it removed.
                    None => {}
                }
                tracing::debug!(%temp_id, id = %confirmed.id, "task creation confirmed");
                Ok(confirmed)
            }
            Err(source) => {
                let mut state = self.state();
                let recovery = if state.generation == generation {
                    state.tasks.retain(|t| t.id != temp_id);
                    Recovery::RolledBack
                } else {
                    Recovery::Discarded
                };
                tracing::warn!(%temp_id, error = %source, ?recovery, "task creation failed");
                Err(TaskSyncError::Create { source, recovery })
            }
        }
    }

    /// Move a task to the end of the `status` column.
    ///
    /// The new order is the number of tasks in `status` at call time,
    /// counting the task itself if it is already there.
    pub async fn move_task(&self, id: &str, status: TaskStatus) -> Result<(), TaskSyncError> {
        let (patch, generation) = {
            let mut state = self.state();
            let order = state.tasks.iter().filter(|t| t.status == status).count() as i64;
            let patch = TaskPatch::placement(status, order);
            patch.apply_to(state.find_mut(id)?);
            (patch, state.generation)
        };
        tracing::debug!(task_id = id, %status, "task moved locally");

        if let Err(source) = self.repo.update(id, patch).await {
            let recovery = self.resync(generation).await;
            return Err(TaskSyncError::Move {
                task_id: id.to_string(),
                source,
                recovery,
            });
        }
        Ok(())
    }

    /// Merge `patch` into a task.
    pub async fn edit(&self, id: &str, patch: TaskPatch) -> Result<(), TaskSyncError> {
        let patch = patch.validated()?;
        let generation = {
            let mut state = self.state();
            let task = state.find_mut(id)?;
            if patch.is_empty() {
                return Ok(());
            }
            patch.apply_to(task);
            state.generation
        };
        tracing::debug!(task_id = id, "task edited locally");

        if let Err(source) = self.repo.update(id, patch).await {
            let recovery = self.resync(generation).await;
            return Err(TaskSyncError::Edit {
                task_id: id.to_string(),
                source,
                recovery,
            });
        }
        Ok(())
    }

    /// Remove a task; a failed remote delete restores the list exactly as
    /// it was before this call.
    pub async fn delete(&self, id: &str) -> Result<(), TaskSyncError> {
        let (snapshot, generation) = {
            let mut state = self.state();
            let idx = state
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| TaskSyncError::UnknownTask(id.to_string()))?;
            let snapshot = state.tasks.clone();
            state.tasks.remove(idx);
            (snapshot, state.generation)
        };
        tracing::debug!(task_id = id, "task deleted locally");

        if let Err(source) = self.repo.delete(id).await {
            let mut state = self.state();
            let recovery = if state.generation == generation {
                state.tasks = snapshot;
                Recovery::RolledBack
            } else {
                Recovery::Discarded
            };
            tracing::warn!(task_id = id, error = %source, ?recovery, "task delete failed");
            return Err(TaskSyncError::Delete {
                task_id: id.to_string(),
                source,
                recovery,
            });
        }
        Ok(())
    }

    /// Apply a batch of order changes, all or nothing on the remote side.
    pub async fn reorder(&self, updates: Vec<OrderUpdate>) -> Result<(), TaskSyncError> {
        if updates.is_empty() {
            return Ok(());
        }
        let generation = {
            let mut state = self.state();
            if let Some(missing) = updates.iter().find(|u| state.find(&u.id).is_none()) {
                return Err(TaskSyncError::UnknownTask(missing.id.clone()));
            }
            for update in &updates {
                state.find_mut(&update.id)?.order = update.order;
            }
            state.generation
        };
        tracing::debug!(count = updates.len(), "tasks reordered locally");

        if let Err(source) = self.repo.batch_update_order(&updates).await {
            let recovery = self.resync(generation).await;
            return Err(TaskSyncError::Reorder { source, recovery });
        }
        Ok(())
    }

    /// Record one completed focus session on a task.
    pub async fn increment_pomodoro(&self, id: &str) -> Result<(), TaskSyncError> {
        let (current, generation) = {
            let mut state = self.state();
            let task = state.find_mut(id)?;
            let current = task.completed_pomodoros;
            task.completed_pomodoros = current.saturating_add(1);
            (current, state.generation)
        };
        tracing::debug!(task_id = id, completed = current + 1, "pomodoro recorded locally");

        if let Err(source) = self.repo.increment_pomodoros(id, current).await {
            let recovery = self.resync(generation).await;
            return Err(TaskSyncError::Increment {
                task_id: id.to_string(),
                source,
                recovery,
            });
        }
        Ok(())
    }

    /// Replace the checklist of a task.
    pub async fn set_subtasks(&self, id: &str, subtasks: Vec<Subtask>) -> Result<(), TaskSyncError> {
        let generation = {
            let mut state = self.state();
            state.find_mut(id)?.subtasks = subtasks.clone();
            state.generation
        };

        let patch = TaskPatch {
            subtasks: Some(subtasks),
            ..TaskPatch::default()
        };
        if let Err(source) = self.repo.update(id, patch).await {
            let recovery = self.resync(generation).await;
            return Err(TaskSyncError::Subtasks {
                task_id: id.to_string(),
                source,
                recovery,
            });
        }
        Ok(())
    }

    /// Append a new open subtask.
    pub async fn add_subtask(&self, id: &str, title: &str) -> Result<Subtask, TaskSyncError> {
        let subtask = Subtask::new(title)?;
        let mut subtasks = self
            .task(id)
            .ok_or_else(|| TaskSyncError::UnknownTask(id.to_string()))?
            .subtasks;
        subtasks.push(subtask.clone());
        self.set_subtasks(id, subtasks).await?;
        Ok(subtask)
    }

    /// Flip the completion flag of one subtask.
    pub async fn toggle_subtask(&self, id: &str, subtask_id: &str) -> Result<(), TaskSyncError> {
        let mut subtasks = self
            .task(id)
            .ok_or_else(|| TaskSyncError::UnknownTask(id.to_string()))?
            .subtasks;
        let subtask = subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "subtask".into(),
                value: subtask_id.into(),
            })?;
        subtask.completed = !subtask.completed;
        self.set_subtasks(id, subtasks).await
    }

    /// Replace the list with server truth after a failed write.
    async fn resync(&self, generation: u64) -> Recovery {
        let user_id = {
            let state = self.state();
            match &state.user_id {
                Some(user_id) if state.generation == generation => user_id.clone(),
                _ => return Recovery::Discarded,
            }
        };
        tracing::warn!(%user_id, "remote write failed, reloading tasks");

        match self.repo.list_by_user(&user_id).await {
            Ok(mut tasks) => {
                sort_for_board(&mut tasks);
                let mut state = self.state();
                if state.generation != generation {
                    return Recovery::Discarded;
                }
                state.tasks = tasks;
                Recovery::Reloaded
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "reload after failed write also failed");
                Recovery::ReloadFailed
            }
        }
    }
}
