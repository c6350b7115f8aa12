//! Task model for the Kanban board.
//!
//! A [`Task`] lives in one of three columns ([`TaskStatus`]) and carries its
//! own pomodoro estimate and progress. Creation input is [`NewTask`], partial
//! edits are [`TaskPatch`].

mod form;

pub use form::{parse_tags, NewTask, TaskPatch, DEFAULT_ESTIMATE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Kanban column a task sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    /// Every column in board order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::Doing, TaskStatus::Done];

    /// Sort rank: todo < doing < done.
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::Doing => 1,
            TaskStatus::Done => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "doing" => Ok(TaskStatus::Doing),
            "done" => Ok(TaskStatus::Done),
            other => Err(ValidationError::UnknownVariant {
                kind: "status".into(),
                value: other.into(),
            }),
        }
    }
}

/// Self-rated mental effort of a task. Purely descriptive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveLoad {
    Low,
    #[default]
    Medium,
    High,
}

impl CognitiveLoad {
    pub fn as_str(self) -> &'static str {
        match self {
            CognitiveLoad::Low => "low",
            CognitiveLoad::Medium => "medium",
            CognitiveLoad::High => "high",
        }
    }
}

impl fmt::Display for CognitiveLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CognitiveLoad {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(CognitiveLoad::Low),
            "medium" => Ok(CognitiveLoad::Medium),
            "high" => Ok(CognitiveLoad::High),
            other => Err(ValidationError::UnknownVariant {
                kind: "cognitive load".into(),
                value: other.into(),
            }),
        }
    }
}

/// Checklist item inside a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    /// New open subtask with a generated id and a trimmed title.
    pub fn new(title: &str) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Blank {
                field: "subtask title".into(),
            });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
        })
    }
}

/// A task on the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Store-assigned id, or an `opt-` prefixed id while creation is in flight
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub estimated_pomodoros: u32,
    /// Completed focus sessions; only ever grows by one per finished focus phase
    #[serde(default)]
    pub completed_pomodoros: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cognitive_load: CognitiveLoad,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Position inside its status column
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    /// True while this entry is an optimistic placeholder awaiting its
    /// store-assigned id.
    pub fn is_provisional(&self) -> bool {
        self.id.starts_with(PROVISIONAL_ID_PREFIX)
    }
}

/// Prefix of locally generated ids used during optimistic creation.
pub const PROVISIONAL_ID_PREFIX: &str = "opt-";

/// One entry of a bulk reorder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: String,
    pub order: i64,
}

/// Sort tasks for the board: status rank first, then ascending `order`.
///
/// The sort is stable so tasks sharing a position keep their relative order.
pub fn sort_for_board(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| (t.status.rank(), t.order));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus, order: i64) -> Task {
        Task {
            id: id.into(),
            user_id: "u1".into(),
            title: id.into(),
            description: None,
            status,
            estimated_pomodoros: 1,
            completed_pomodoros: 0,
            tags: vec![],
            cognitive_load: CognitiveLoad::Medium,
            subtasks: vec![],
            order,
            created_at: Utc::now(),
            due_date: None,
        }
    }

    #[test]
    fn board_sort_uses_status_then_order() {
        let mut tasks = vec![
            task("d0", TaskStatus::Done, 0),
            task("t1", TaskStatus::Todo, 1),
            task("g0", TaskStatus::Doing, 0),
            task("t0", TaskStatus::Todo, 0),
        ];
        sort_for_board(&mut tasks);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t0", "t1", "g0", "d0"]);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Doing".parse::<TaskStatus>().unwrap(), TaskStatus::Doing);
        assert!("later".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn blank_subtask_is_rejected() {
        assert!(Subtask::new("   ").is_err());
        let sub = Subtask::new("  write tests ").unwrap();
        assert_eq!(sub.title, "write tests");
        assert!(!sub.completed);
    }

    #[test]
    fn task_json_uses_lowercase_enums() {
        let json = serde_json::to_value(task("a", TaskStatus::Doing, 0)).unwrap();
        assert_eq!(json["status"], "doing");
        assert_eq!(json["cognitive_load"], "medium");
    }

    #[test]
    fn provisional_ids_are_recognised() {
        assert!(task("opt-1-0", TaskStatus::Todo, 0).is_provisional());
        assert!(!task("abc", TaskStatus::Todo, 0).is_provisional());
    }
}
