use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change of the pomodoro timer produces an Event.
/// The CLI renders them; the task store listens for focus completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        seconds_left: u32,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimerTicked {
        phase: Phase,
        seconds_left: u32,
    },
    TimerPaused {
        phase: Phase,
        seconds_left: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A phase ran out or was completed early. The timer is stopped on
    /// `next`.
    PhaseCompleted {
        phase: Phase,
        next: Phase,
        completed_focus_count: u32,
        at: DateTime<Utc>,
    },
    /// A focus phase finished. `task_id` is the task bound at that moment.
    FocusCompleted {
        task_id: Option<String>,
        completed_focus_count: u32,
        at: DateTime<Utc>,
    },
    TaskBound {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerTicked { .. } => "timer_ticked",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerReset { .. } => "timer_reset",
            Event::PhaseCompleted { .. } => "phase_completed",
            Event::FocusCompleted { .. } => "focus_completed",
            Event::TaskBound { .. } => "task_bound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let json = serde_json::to_value(Event::FocusCompleted {
            task_id: Some("t1".into()),
            completed_focus_count: 1,
            at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["type"], "FocusCompleted");
        assert_eq!(json["task_id"], "t1");
    }
}
