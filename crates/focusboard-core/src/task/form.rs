//! Creation input and partial updates for tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CognitiveLoad, Subtask, Task, TaskStatus};
use crate::error::ValidationError;

/// Estimate used when the caller does not pick one.
pub const DEFAULT_ESTIMATE: u32 = 2;

/// Everything needed to create a task except what the store assigns
/// (id, owner, creation time, completed pomodoros).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub estimated_pomodoros: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cognitive_load: CognitiveLoad,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A `todo` task with the default estimate and medium load.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            estimated_pomodoros: DEFAULT_ESTIMATE,
            tags: Vec::new(),
            cognitive_load: CognitiveLoad::Medium,
            subtasks: Vec::new(),
            order: 0,
            due_date: None,
        }
    }

    /// Trim text fields and check the invariants.
    ///
    /// A blank description becomes `None`; blank tags are dropped.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(ValidationError::Blank {
                field: "title".into(),
            });
        }
        if self.estimated_pomodoros == 0 {
            return Err(ValidationError::InvalidValue {
                field: "estimated_pomodoros".into(),
                message: "must be at least 1".into(),
            });
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.tags = normalize_tags(self.tags);
        Ok(self)
    }

    /// Materialize as a task with the given identity.
    pub fn into_task(self, id: String, user_id: String, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            user_id,
            title: self.title,
            description: self.description,
            status: self.status,
            estimated_pomodoros: self.estimated_pomodoros,
            completed_pomodoros: 0,
            tags: self.tags,
            cognitive_load: self.cognitive_load,
            subtasks: self.subtasks,
            order: self.order,
            created_at,
            due_date: self.due_date,
        }
    }
}

/// Partial update of a task. `None` leaves a field untouched.
///
/// `description` and `due_date` are doubly optional: `Some(None)` clears
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub estimated_pomodoros: Option<u32>,
    pub completed_pomodoros: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub cognitive_load: Option<CognitiveLoad>,
    pub subtasks: Option<Vec<Subtask>>,
    pub order: Option<i64>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Patch moving a task to the end of another column.
    pub fn placement(status: TaskStatus, order: i64) -> Self {
        Self {
            status: Some(status),
            order: Some(order),
            ..Self::default()
        }
    }

    /// Trim text fields and check the same invariants as [`NewTask`].
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if let Some(title) = self.title.take() {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ValidationError::Blank {
                    field: "title".into(),
                });
            }
            self.title = Some(title);
        }
        if self.estimated_pomodoros == Some(0) {
            return Err(ValidationError::InvalidValue {
                field: "estimated_pomodoros".into(),
                message: "must be at least 1".into(),
            });
        }
        // Only a completed focus phase moves the counter.
        if self.completed_pomodoros.is_some() {
            return Err(ValidationError::InvalidValue {
                field: "completed_pomodoros".into(),
                message: "only changes when a focus phase completes".into(),
            });
        }
        self.description = self.description.map(|d| {
            d.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        });
        self.tags = self.tags.map(normalize_tags);
        Ok(self)
    }

    /// Merge the set fields into `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(estimate) = self.estimated_pomodoros {
            task.estimated_pomodoros = estimate;
        }
        if let Some(completed) = self.completed_pomodoros {
            task.completed_pomodoros = completed;
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
        if let Some(load) = self.cognitive_load {
            task.cognitive_load = load;
        }
        if let Some(subtasks) = &self.subtasks {
            task.subtasks = subtasks.clone();
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
    }
}

/// Split a comma-separated tag field, trimming and dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
