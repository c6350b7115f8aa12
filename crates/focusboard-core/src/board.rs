//! Read-only views over a task list: kanban columns and the dashboard
//! summary.
//!
//! The doing-column limit is advisory. Views report when a column is at its
//! limit; nothing here refuses a move.

use serde::Serialize;

use crate::profile::ProfileConfig;
use crate::task::{CognitiveLoad, Task, TaskStatus};

/// One kanban column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub status: TaskStatus,
    /// Tasks of this status in ascending `order`
    pub tasks: Vec<Task>,
    /// Only set on the doing column
    pub limit: Option<usize>,
}

impl Column {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when the column holds at least `limit` tasks.
    pub fn is_at_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.tasks.len() >= limit)
    }

    /// Header count, e.g. `2/3` or `4`.
    pub fn count_label(&self) -> String {
        match self.limit {
            Some(limit) => format!("{}/{}", self.tasks.len(), limit),
            None => self.tasks.len().to_string(),
        }
    }
}

/// Columns shown for a profile: `todo` and `doing` when the kanban is
/// simplified, all three otherwise.
pub fn visible_statuses(config: &ProfileConfig) -> &'static [TaskStatus] {
    if config.simplified_kanban {
        &TaskStatus::ALL[..2]
    } else {
        &TaskStatus::ALL
    }
}

/// Tasks with `status`, sorted by `order`.
pub fn tasks_in(tasks: &[Task], status: TaskStatus) -> Vec<Task> {
    let mut column: Vec<Task> = tasks.iter().filter(|t| t.status == status).cloned().collect();
    column.sort_by_key(|t| t.order);
    column
}

/// Build the visible columns of the board.
pub fn columns(tasks: &[Task], config: &ProfileConfig) -> Vec<Column> {
    visible_statuses(config)
        .iter()
        .map(|&status| Column {
            status,
            tasks: tasks_in(tasks, status),
            limit: (status == TaskStatus::Doing).then_some(config.max_tasks_in_doing),
        })
        .collect()
}

/// Tasks a pomodoro can be bound to.
pub fn focusable(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.status != TaskStatus::Done).collect()
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub todo: usize,
    pub doing: usize,
    pub done: usize,
    pub completed_pomodoros: u32,
    /// High-load tasks not yet done
    pub active_high_load: usize,
}

impl BoardSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut summary, task| {
            match task.status {
                TaskStatus::Todo => summary.todo += 1,
                TaskStatus::Doing => summary.doing += 1,
                TaskStatus::Done => summary.done += 1,
            }
            summary.completed_pomodoros = summary
                .completed_pomodoros
                .saturating_add(task.completed_pomodoros);
            if task.cognitive_load == CognitiveLoad::High && task.status != TaskStatus::Done {
                summary.active_high_load += 1;
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.todo + self.doing + self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::NavigationProfile;
    use chrono::Utc;

    fn task(id: &str, status: TaskStatus, order: i64, load: CognitiveLoad, done: u32) -> Task {
        Task {
            id: id.into(),
            user_id: "u1".into(),
            title: id.into(),
            description: None,
            status,
            estimated_pomodoros: 2,
            completed_pomodoros: done,
            tags: vec![],
            cognitive_load: load,
            subtasks: vec![],
            order,
            created_at: Utc::now(),
            due_date: None,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("a", TaskStatus::Todo, 1, CognitiveLoad::High, 0),
            task("b", TaskStatus::Todo, 0, CognitiveLoad::Low, 1),
            task("c", TaskStatus::Doing, 0, CognitiveLoad::High, 2),
            task("d", TaskStatus::Done, 0, CognitiveLoad::High, 3),
        ]
    }

    #[test]
    fn beginners_see_two_columns() {
        let cols = columns(&sample(), NavigationProfile::Beginner.config());
        let statuses: Vec<_> = cols.iter().map(|c| c.status).collect();
        assert_eq!(statuses, [TaskStatus::Todo, TaskStatus::Doing]);

        let cols = columns(&sample(), NavigationProfile::Advanced.config());
        assert_eq!(cols.len(), 3);
    }

    #[test]
    fn columns_are_sorted_by_order() {
        let cols = columns(&sample(), NavigationProfile::Intermediate.config());
        let todo: Vec<_> = cols[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(todo, ["b", "a"]);
    }

    #[test]
    fn doing_limit_follows_profile() {
        let cols = columns(&sample(), NavigationProfile::Beginner.config());
        let doing = &cols[1];
        assert_eq!(doing.limit, Some(1));
        assert!(doing.is_at_limit());
        assert_eq!(doing.count_label(), "1/1");
        assert!(!cols[0].is_at_limit());
        assert_eq!(cols[0].count_label(), "2");

        let cols = columns(&sample(), NavigationProfile::Intermediate.config());
        assert!(!cols[1].is_at_limit());
    }

    #[test]
    fn summary_counts() {
        let summary = BoardSummary::from_tasks(&sample());
        assert_eq!(
            summary,
            BoardSummary {
                todo: 2,
                doing: 1,
                done: 1,
                completed_pomodoros: 6,
                active_high_load: 2,
            }
        );
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn summary_pomodoro_total_saturates() {
        let tasks = [
            task("a", TaskStatus::Done, 0, CognitiveLoad::Low, u32::MAX),
            task("b", TaskStatus::Done, 1, CognitiveLoad::Low, 5),
        ];
        assert_eq!(BoardSummary::from_tasks(&tasks).completed_pomodoros, u32::MAX);
    }

    #[test]
    fn done_tasks_cannot_be_focused() {
        let tasks = sample();
        let ids: Vec<_> = focusable(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
