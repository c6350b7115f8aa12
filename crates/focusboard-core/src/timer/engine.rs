//! Pomodoro engine implementation.
//!
//! The engine is a plain state machine. It does not own a clock: the caller
//! invokes `tick()` once per elapsed second while it is running and passes
//! the current instant to the commands that need one.
//!
//! ## Phase cycle
//!
//! ```text
//! focus -> shortBreak -> focus -> ... -> focus -> longBreak -> focus
//! ```
//!
//! Every completed focus phase bumps the focus count; the phase after it is
//! a long break when the new count is a multiple of the plan's cadence.
//! Phases never chain: after a transition the timer waits for `start()`.
//!
//! Session records are not written here. Commands queue
//! [`SessionRequest`]s which the owner drains with
//! [`take_session_requests`](PomodoroEngine::take_session_requests), performs
//! remotely and reports back through
//! [`attach_session`](PomodoroEngine::attach_session).

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use super::phase::{Phase, PhasePlan};
use crate::events::Event;

/// Remote session bookkeeping the engine asks its owner to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    /// Open a record; report the id back with the same ticket.
    Open {
        ticket: u64,
        user_id: String,
        task_id: String,
        phase: Phase,
    },
    Close {
        session_id: String,
        duration_min: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionSlot {
    Idle,
    /// Open request issued, id not known yet.
    Pending { ticket: u64 },
    Open { session_id: String },
}

/// Point-in-time view of the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub seconds_left: u32,
    pub total_secs: u32,
    pub running: bool,
    pub completed_focus_count: u32,
    pub task_id: Option<String>,
    /// Elapsed share of the current phase, 0..=100.
    pub progress_pct: u8,
}

/// Focus/break countdown bound to at most one task.
#[derive(Debug, Clone)]
pub struct PomodoroEngine {
    plan: PhasePlan,
    phase: Phase,
    running: bool,
    seconds_left: u32,
    completed_focus_count: u32,
    task_id: Option<String>,
    user_id: Option<String>,
    /// Instant of the last `start()`.
    started_at: Option<Instant>,
    session: SessionSlot,
    /// Tickets whose phase ended before their id arrived, with the duration
    /// to close them with.
    unacknowledged: HashMap<u64, u32>,
    next_ticket: u64,
    requests: Vec<SessionRequest>,
}

impl PomodoroEngine {
    /// Stopped engine on a full focus phase.
    pub fn new(plan: PhasePlan) -> Self {
        Self {
            plan,
            phase: Phase::Focus,
            running: false,
            seconds_left: plan.duration_secs(Phase::Focus),
            completed_focus_count: 0,
            task_id: None,
            user_id: None,
            started_at: None,
            session: SessionSlot::Idle,
            unacknowledged: HashMap::new(),
            next_ticket: 0,
            requests: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    /// Whether a session record is open or being opened.
    pub fn has_session(&self) -> bool {
        self.session != SessionSlot::Idle
    }

    pub fn total_secs(&self) -> u32 {
        self.plan.duration_secs(self.phase)
    }

    /// Elapsed share of the current phase, rounded to a whole percent.
    pub fn progress_pct(&self) -> u8 {
        let total = self.total_secs();
        if total == 0 {
            return 0;
        }
        let elapsed = total.saturating_sub(self.seconds_left) as f64;
        (elapsed / total as f64 * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            seconds_left: self.seconds_left,
            total_secs: self.total_secs(),
            running: self.running,
            completed_focus_count: self.completed_focus_count,
            task_id: self.task_id.clone(),
            progress_pct: self.progress_pct(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown. No effect while running.
    ///
    /// In a focus phase with a bound task and a signed-in user this asks for
    /// a new session record.
    pub fn start(&mut self, now: Instant) -> Vec<Event> {
        if self.running {
            return Vec::new();
        }
        self.running = true;
        self.started_at = Some(now);

        if self.phase == Phase::Focus {
            if let (Some(task_id), Some(user_id)) = (&self.task_id, &self.user_id) {
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                if let SessionSlot::Open { session_id } = &self.session {
                    tracing::debug!(%session_id, "superseding open session record");
                }
                self.requests.push(SessionRequest::Open {
                    ticket,
                    user_id: user_id.clone(),
                    task_id: task_id.clone(),
                    phase: self.phase,
                });
                self.session = SessionSlot::Pending { ticket };
            }
        }

        vec![Event::TimerStarted {
            phase: self.phase,
            seconds_left: self.seconds_left,
            task_id: self.task_id.clone(),
            at: Utc::now(),
        }]
    }

    /// One second elapsed. Completes the phase when the last second runs
    /// out.
    pub fn tick(&mut self, now: Instant) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        if self.seconds_left <= 1 {
            self.seconds_left = 0;
            return self.advance(now);
        }
        self.seconds_left -= 1;
        vec![Event::TimerTicked {
            phase: self.phase,
            seconds_left: self.seconds_left,
        }]
    }

    /// Stop the clock, keeping phase, time left and any session record.
    pub fn pause(&mut self) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        self.running = false;
        vec![Event::TimerPaused {
            phase: self.phase,
            seconds_left: self.seconds_left,
            at: Utc::now(),
        }]
    }

    /// Back to a stopped, full focus phase. The focus count is kept and any
    /// session record is forgotten without being closed.
    pub fn reset(&mut self) -> Vec<Event> {
        self.running = false;
        self.phase = Phase::Focus;
        self.seconds_left = self.plan.duration_secs(Phase::Focus);
        self.started_at = None;
        if self.session != SessionSlot::Idle {
            tracing::debug!("forgetting session record on reset");
        }
        self.session = SessionSlot::Idle;
        vec![Event::TimerReset { at: Utc::now() }]
    }

    /// Finish the current phase now, exactly as if it had run out.
    pub fn complete(&mut self, now: Instant) -> Vec<Event> {
        self.advance(now)
    }

    /// Bind the next focus phases to `task_id`. The countdown is untouched.
    pub fn bind_task(&mut self, task_id: Option<String>) -> Vec<Event> {
        self.task_id = task_id.clone();
        vec![Event::TaskBound {
            task_id,
            at: Utc::now(),
        }]
    }

    /// Owner of new session records.
    pub fn set_user(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    /// Session bookkeeping queued since the last call.
    pub fn take_session_requests(&mut self) -> Vec<SessionRequest> {
        std::mem::take(&mut self.requests)
    }

    /// The record asked for under `ticket` now exists as `session_id`.
    pub fn attach_session(&mut self, ticket: u64, session_id: String) {
        if self.session == (SessionSlot::Pending { ticket }) {
            self.session = SessionSlot::Open { session_id };
        } else if let Some(duration_min) = self.unacknowledged.remove(&ticket) {
            self.requests.push(SessionRequest::Close {
                session_id,
                duration_min,
            });
        } else {
            tracing::debug!(ticket, %session_id, "ignoring session record no longer tracked");
        }
    }

    /// The record asked for under `ticket` could not be created.
    pub fn session_failed(&mut self, ticket: u64) {
        if self.session == (SessionSlot::Pending { ticket }) {
            self.session = SessionSlot::Idle;
        }
        self.unacknowledged.remove(&ticket);
    }

    fn advance(&mut self, now: Instant) -> Vec<Event> {
        let at = Utc::now();
        // Time run before a pause is not counted.
        let duration_min = self
            .started_at
            .map(|start| (now.saturating_duration_since(start).as_secs_f64() / 60.0).round() as u32)
            .unwrap_or(0);
        match std::mem::replace(&mut self.session, SessionSlot::Idle) {
            SessionSlot::Open { session_id } => self.requests.push(SessionRequest::Close {
                session_id,
                duration_min,
            }),
            SessionSlot::Pending { ticket } => {
                self.unacknowledged.insert(ticket, duration_min);
            }
            SessionSlot::Idle => {}
        }

        let mut events = Vec::new();
        let finished = self.phase;
        let next = if finished == Phase::Focus {
            self.completed_focus_count += 1;
            events.push(Event::FocusCompleted {
                task_id: self.task_id.clone(),
                completed_focus_count: self.completed_focus_count,
                at,
            });
            self.plan.break_after(self.completed_focus_count)
        } else {
            Phase::Focus
        };

        self.phase = next;
        self.seconds_left = self.plan.duration_secs(next);
        self.running = false;
        self.started_at = None;
        events.push(Event::PhaseCompleted {
            phase: finished,
            next,
            completed_focus_count: self.completed_focus_count,
            at,
        });
        events
    }
}

impl Default for PomodoroEngine {
    fn default() -> Self {
        Self::new(PhasePlan::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn bound_engine() -> PomodoroEngine {
        let mut engine = PomodoroEngine::default();
        engine.set_user(Some("u1".into()));
        engine.bind_task(Some("t1".into()));
        engine
    }

    fn open_ticket(engine: &mut PomodoroEngine) -> u64 {
        match engine.take_session_requests().as_slice() {
            [SessionRequest::Open { ticket, .. }] => *ticket,
            other => panic!("expected one open request, got {other:?}"),
        }
    }

    #[test]
    fn new_engine_is_stopped_on_full_focus() {
        let engine = PomodoroEngine::default();
        assert_eq!(engine.phase(), Phase::Focus);
        assert_eq!(engine.seconds_left(), 25 * 60);
        assert!(!engine.is_running());
        assert_eq!(engine.progress_pct(), 0);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut engine = PomodoroEngine::default();
        let now = Instant::now();
        assert_eq!(engine.start(now).len(), 1);
        assert!(engine.start(now).is_empty());
        assert!(engine.is_running());
    }

    #[test]
    fn tick_counts_down_and_completes_on_last_second() {
        let mut engine = PomodoroEngine::new(PhasePlan {
            focus_min: 1,
            ..PhasePlan::default()
        });
        let now = Instant::now();
        engine.start(now);
        for _ in 0..59 {
            engine.tick(now);
        }
        assert_eq!(engine.seconds_left(), 1);
        let events = engine.tick(now);
        assert!(matches!(events[0], Event::FocusCompleted { .. }));
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.seconds_left(), 5 * 60);
        assert!(!engine.is_running());
    }

    #[test]
    fn ticks_are_ignored_while_stopped() {
        let mut engine = PomodoroEngine::default();
        assert!(engine.tick(Instant::now()).is_empty());
        assert_eq!(engine.seconds_left(), 25 * 60);
    }

    #[test]
    fn fourth_focus_earns_long_break() {
        let mut engine = PomodoroEngine::default();
        let now = Instant::now();
        for expected in [Phase::ShortBreak, Phase::ShortBreak, Phase::ShortBreak] {
            engine.complete(now);
            assert_eq!(engine.phase(), expected);
            engine.complete(now);
            assert_eq!(engine.phase(), Phase::Focus);
        }
        assert_eq!(engine.completed_focus_count(), 3);
        engine.complete(now);
        assert_eq!(engine.completed_focus_count(), 4);
        assert_eq!(engine.phase(), Phase::LongBreak);
        assert_eq!(engine.seconds_left(), 15 * 60);
    }

    #[test]
    fn break_completion_does_not_count() {
        let mut engine = PomodoroEngine::default();
        let now = Instant::now();
        engine.complete(now);
        let events = engine.complete(now);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Event::PhaseCompleted { phase: Phase::ShortBreak, next: Phase::Focus, .. }
        ));
        assert_eq!(engine.completed_focus_count(), 1);
    }

    #[test]
    fn pause_then_start_resumes_exactly() {
        let mut engine = PomodoroEngine::default();
        let now = Instant::now();
        engine.start(now);
        for _ in 0..10 {
            engine.tick(now);
        }
        engine.pause();
        engine.tick(now);
        assert_eq!(engine.seconds_left(), 25 * 60 - 10);
        engine.start(now);
        assert!(engine.is_running());
        assert_eq!(engine.seconds_left(), 25 * 60 - 10);
        assert_eq!(engine.progress_pct(), 1);
    }

    #[test]
    fn reset_keeps_the_count() {
        let mut engine = PomodoroEngine::default();
        let now = Instant::now();
        engine.complete(now);
        engine.start(now);
        engine.tick(now);
        engine.reset();
        assert_eq!(engine.phase(), Phase::Focus);
        assert_eq!(engine.seconds_left(), 25 * 60);
        assert!(!engine.is_running());
        assert_eq!(engine.completed_focus_count(), 1);
    }

    #[test]
    fn focus_completion_names_the_bound_task() {
        let mut engine = bound_engine();
        let events = engine.complete(Instant::now());
        assert!(matches!(
            &events[0],
            Event::FocusCompleted { task_id: Some(id), completed_focus_count: 1, .. } if id == "t1"
        ));
    }

    #[test]
    fn rebinding_while_running_keeps_the_countdown() {
        let mut engine = bound_engine();
        let now = Instant::now();
        engine.start(now);
        engine.tick(now);
        engine.bind_task(Some("t2".into()));
        assert!(engine.is_running());
        assert_eq!(engine.seconds_left(), 25 * 60 - 1);
        assert_eq!(engine.task_id(), Some("t2"));
    }

    #[test]
    fn focus_start_opens_a_session_and_completion_closes_it() {
        let mut engine = bound_engine();
        let start = Instant::now();
        engine.start(start);
        let ticket = open_ticket(&mut engine);
        engine.attach_session(ticket, "s1".into());

        engine.complete(start + Duration::from_secs(24 * 60 + 40));
        assert_eq!(
            engine.take_session_requests(),
            vec![SessionRequest::Close {
                session_id: "s1".into(),
                duration_min: 25,
            }]
        );
        assert!(!engine.has_session());
    }

    #[test]
    fn no_session_without_task_user_or_focus() {
        let mut engine = PomodoroEngine::default();
        engine.set_user(Some("u1".into()));
        engine.start(Instant::now());
        assert!(engine.take_session_requests().is_empty());

        let mut engine = PomodoroEngine::default();
        engine.bind_task(Some("t1".into()));
        engine.start(Instant::now());
        assert!(engine.take_session_requests().is_empty());

        let mut engine = bound_engine();
        engine.complete(Instant::now());
        engine.start(Instant::now());
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert!(engine.take_session_requests().is_empty());
    }

    #[test]
    fn phase_ending_before_id_arrives_closes_once_known() {
        let mut engine = bound_engine();
        let start = Instant::now();
        engine.start(start);
        let ticket = open_ticket(&mut engine);
        engine.complete(start + Duration::from_secs(120));
        assert!(engine.take_session_requests().is_empty());

        engine.attach_session(ticket, "s1".into());
        assert_eq!(
            engine.take_session_requests(),
            vec![SessionRequest::Close {
                session_id: "s1".into(),
                duration_min: 2,
            }]
        );
    }

    #[test]
    fn reset_forgets_the_session_without_closing() {
        let mut engine = bound_engine();
        engine.start(Instant::now());
        let ticket = open_ticket(&mut engine);
        engine.attach_session(ticket, "s1".into());
        engine.reset();
        assert!(!engine.has_session());
        assert!(engine.take_session_requests().is_empty());

        // A late id for a forgotten ticket is ignored too.
        engine.start(Instant::now());
        let second = open_ticket(&mut engine);
        engine.reset();
        engine.attach_session(second, "s2".into());
        assert!(engine.take_session_requests().is_empty());
    }

    #[test]
    fn pause_keeps_the_session() {
        let mut engine = bound_engine();
        engine.start(Instant::now());
        let ticket = open_ticket(&mut engine);
        engine.attach_session(ticket, "s1".into());
        engine.pause();
        assert!(engine.has_session());
    }

    #[test]
    fn failed_open_clears_the_pending_slot() {
        let mut engine = bound_engine();
        engine.start(Instant::now());
        let ticket = open_ticket(&mut engine);
        engine.session_failed(ticket);
        assert!(!engine.has_session());
        engine.complete(Instant::now());
        assert!(engine.take_session_requests().is_empty());
    }

    #[test]
    fn snapshot_reports_progress() {
        let mut engine = PomodoroEngine::new(PhasePlan {
            focus_min: 1,
            ..PhasePlan::default()
        });
        let now = Instant::now();
        engine.start(now);
        for _ in 0..30 {
            engine.tick(now);
        }
        let snap = engine.snapshot();
        assert_eq!(snap.seconds_left, 30);
        assert_eq!(snap.total_secs, 60);
        assert_eq!(snap.progress_pct, 50);
        assert!(snap.running);
    }
}
