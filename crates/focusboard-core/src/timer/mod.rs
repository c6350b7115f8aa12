mod engine;
mod phase;
mod runner;

pub use engine::{PomodoroEngine, SessionRequest, TimerSnapshot};
pub use phase::{Phase, PhasePlan};
pub use runner::{spawn_focus_forwarder, PomodoroHandle, PomodoroRunner};
