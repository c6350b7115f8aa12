use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Pomodoro phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Focus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::ShortBreak => "shortBreak",
            Phase::LongBreak => "longBreak",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "focus" => Ok(Phase::Focus),
            "shortBreak" | "short_break" => Ok(Phase::ShortBreak),
            "longBreak" | "long_break" => Ok(Phase::LongBreak),
            other => Err(ValidationError::UnknownVariant {
                kind: "phase".into(),
                value: other.into(),
            }),
        }
    }
}

/// Nominal phase lengths in whole minutes plus the long-break cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    pub focus_min: u32,
    pub short_break_min: u32,
    pub long_break_min: u32,
    /// Every n-th completed focus phase is followed by a long break.
    pub long_break_every: u32,
}

impl PhasePlan {
    /// Duration of `phase` in minutes.
    pub fn duration_min(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.focus_min,
            Phase::ShortBreak => self.short_break_min,
            Phase::LongBreak => self.long_break_min,
        }
    }

    /// Duration of `phase` in seconds.
    ///
    /// Uses saturating arithmetic so oversized configs cannot overflow.
    pub fn duration_secs(&self, phase: Phase) -> u32 {
        self.duration_min(phase).saturating_mul(60)
    }

    /// Break that follows the focus phase which brought the count to
    /// `completed_focus_count`.
    pub fn break_after(&self, completed_focus_count: u32) -> Phase {
        let every = self.long_break_every.max(1);
        if completed_focus_count % every == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self {
            focus_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            long_break_every: 4,
        }
    }
}
