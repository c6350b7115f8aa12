//! Async front for [`PomodoroEngine`].
//!
//! The engine lives inside a worker task that owns the one-second ticker.
//! Callers talk to it through a cloneable [`PomodoroHandle`]; every state
//! change is published on a broadcast channel. Session records are written
//! in background tasks so a slow or failing store never delays a tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::engine::{PomodoroEngine, SessionRequest, TimerSnapshot};
use crate::error::TimerError;
use crate::events::Event;
use crate::repository::SessionRepository;
use crate::store::TaskStore;

const TICK: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 32;
/// How long shutdown waits for session writes still in flight.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

enum TimerMsg {
    Start { resp: oneshot::Sender<TimerSnapshot> },
    Pause { resp: oneshot::Sender<TimerSnapshot> },
    Reset { resp: oneshot::Sender<TimerSnapshot> },
    Complete { resp: oneshot::Sender<TimerSnapshot> },
    BindTask {
        task_id: Option<String>,
        resp: oneshot::Sender<TimerSnapshot>,
    },
    SetUser {
        user_id: Option<String>,
        resp: oneshot::Sender<TimerSnapshot>,
    },
    Snapshot { resp: oneshot::Sender<TimerSnapshot> },
}

/// Result of a background open-session call.
enum SessionOutcome {
    Opened { ticket: u64, session_id: String },
    OpenFailed { ticket: u64 },
}

/// Handle to a running timer worker.
#[derive(Clone)]
pub struct PomodoroHandle {
    tx: mpsc::Sender<TimerMsg>,
    events: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

/// Owns the worker task; dropping it leaves the worker running until every
/// handle is gone.
pub struct PomodoroRunner {
    handle: PomodoroHandle,
    join: JoinHandle<()>,
}

impl PomodoroRunner {
    /// Spawn the worker on the current runtime.
    pub fn spawn(engine: PomodoroEngine, sessions: Arc<dyn SessionRepository>) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cancel_token = CancellationToken::new();

        let worker = TimerWorker {
            engine,
            sessions,
            events: events.clone(),
        };
        let join = tokio::spawn(worker.run(rx, cancel_token.clone()));

        Self {
            handle: PomodoroHandle {
                tx,
                events,
                cancel_token,
            },
            join,
        }
    }

    pub fn handle(&self) -> PomodoroHandle {
        self.handle.clone()
    }

    /// Stop the ticker and wait for the worker to exit. Session writes still
    /// in flight get a short grace period and are abandoned after it. No
    /// tick is delivered after this returns.
    pub async fn shutdown(self) {
        self.handle.cancel_token.cancel();
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "timer worker ended abnormally");
        }
    }
}

impl PomodoroHandle {
    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn request(
        &self,
        msg: impl FnOnce(oneshot::Sender<TimerSnapshot>) -> TimerMsg,
    ) -> Result<TimerSnapshot, TimerError> {
        if self.cancel_token.is_cancelled() {
            return Err(TimerError::Stopped);
        }
        let (resp, rx) = oneshot::channel();
        self.tx
            .send(msg(resp))
            .await
            .map_err(|_| TimerError::Stopped)?;
        rx.await.map_err(|_| TimerError::Stopped)
    }

    pub async fn start(&self) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::Start { resp }).await
    }

    pub async fn pause(&self) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::Pause { resp }).await
    }

    pub async fn reset(&self) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::Reset { resp }).await
    }

    /// Finish the current phase early.
    pub async fn complete(&self) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::Complete { resp }).await
    }

    pub async fn bind_task(&self, task_id: Option<String>) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::BindTask { task_id, resp })
            .await
    }

    pub async fn set_user(&self, user_id: Option<String>) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::SetUser { user_id, resp })
            .await
    }

    pub async fn snapshot(&self) -> Result<TimerSnapshot, TimerError> {
        self.request(|resp| TimerMsg::Snapshot { resp }).await
    }
}

struct TimerWorker {
    engine: PomodoroEngine,
    sessions: Arc<dyn SessionRepository>,
    events: broadcast::Sender<Event>,
}

impl TimerWorker {
    async fn run(mut self, mut rx: mpsc::Receiver<TimerMsg>, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut inflight: JoinSet<Option<SessionOutcome>> = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        break;
                    };
                    let was_running = self.engine.is_running();
                    self.handle_msg(msg);
                    if !was_running && self.engine.is_running() {
                        ticker.reset();
                    }
                }
                _ = ticker.tick(), if self.engine.is_running() => {
                    let events = self.engine.tick(Instant::now().into_std());
                    self.publish(events);
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => self.settle(joined),
            }
            self.dispatch_sessions(&mut inflight);
        }

        // Sessions whose id arrives late still get closed.
        let drained = tokio::time::timeout(DRAIN_GRACE, async {
            while let Some(joined) = inflight.join_next().await {
                self.settle(joined);
                self.dispatch_sessions(&mut inflight);
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(abandoned = inflight.len(), "session writes still pending at shutdown");
            inflight.abort_all();
        }
        tracing::debug!("timer worker stopped");
    }

    fn settle(&mut self, joined: Result<Option<SessionOutcome>, JoinError>) {
        match joined {
            Ok(Some(SessionOutcome::Opened { ticket, session_id })) => {
                self.engine.attach_session(ticket, session_id);
            }
            Ok(Some(SessionOutcome::OpenFailed { ticket })) => self.engine.session_failed(ticket),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "session write task ended abnormally"),
        }
    }

    fn handle_msg(&mut self, msg: TimerMsg) {
        let now = Instant::now().into_std();
        let (events, resp) = match msg {
            TimerMsg::Start { resp } => (self.engine.start(now), resp),
            TimerMsg::Pause { resp } => (self.engine.pause(), resp),
            TimerMsg::Reset { resp } => (self.engine.reset(), resp),
            TimerMsg::Complete { resp } => (self.engine.complete(now), resp),
            TimerMsg::BindTask { task_id, resp } => (self.engine.bind_task(task_id), resp),
            TimerMsg::SetUser { user_id, resp } => {
                self.engine.set_user(user_id);
                (Vec::new(), resp)
            }
            TimerMsg::Snapshot { resp } => (Vec::new(), resp),
        };
        self.publish(events);
        resp.send(self.engine.snapshot()).ok();
    }

    fn publish(&self, events: Vec<Event>) {
        for event in events {
            tracing::debug!(kind = event.kind(), "timer event");
            // No subscribers is fine.
            self.events.send(event).ok();
        }
    }

    fn dispatch_sessions(&mut self, inflight: &mut JoinSet<Option<SessionOutcome>>) {
        for request in self.engine.take_session_requests() {
            let sessions = self.sessions.clone();
            match request {
                SessionRequest::Open {
                    ticket,
                    user_id,
                    task_id,
                    phase,
                } => {
                    inflight.spawn(async move {
                        let outcome = match sessions.start_session(&user_id, &task_id, phase).await {
                            Ok(session_id) => SessionOutcome::Opened { ticket, session_id },
                            Err(e) => {
                                tracing::warn!(%task_id, error = %e, "failed to open session record");
                                SessionOutcome::OpenFailed { ticket }
                            }
                        };
                        Some(outcome)
                    });
                }
                SessionRequest::Close {
                    session_id,
                    duration_min,
                } => {
                    inflight.spawn(async move {
                        if let Err(e) = sessions.complete_session(&session_id, duration_min).await {
                            tracing::warn!(%session_id, error = %e, "failed to close session record");
                        }
                        None
                    });
                }
            }
        }
    }
}

/// Increment the bound task on every completed focus phase.
///
/// Runs until the event channel closes. Store failures are logged; the
/// store has already resynced by then.
pub fn spawn_focus_forwarder(
    store: Arc<TaskStore>,
    mut events: broadcast::Receiver<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(Event::FocusCompleted {
                    task_id: Some(task_id),
                    ..
                }) => {
                    if let Err(e) = store.increment_pomodoro(&task_id).await {
                        tracing::warn!(%task_id, error = %e, "failed to record pomodoro");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "focus forwarder lagged behind timer events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
