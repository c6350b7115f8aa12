//! # Focusboard Core Library
//!
//! Business logic for Focusboard, a personal kanban board with a pomodoro
//! timer. The `focusboard` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Task Store**: optimistic local copy of the signed-in user's tasks.
//!   Every mutation is visible immediately and reconciled with the remote
//!   repository afterwards (rollback, snapshot restore or full reload).
//! - **Pomodoro Engine**: focus/break state machine driven by an async
//!   runner that owns the one-second ticker.
//! - **Profiles**: cognitive preferences and navigation profiles that shape
//!   what the board exposes.
//! - **Storage**: SQLite persistence and TOML configuration.
//!
//! ## Key Components
//!
//! - [`TaskStore`]: optimistic task list
//! - [`PomodoroEngine`] / [`PomodoroRunner`]: timer state machine and its actor
//! - [`UserProfileStore`]: preferences of the signed-in user
//! - [`Workspace`]: keeps the stores on the signed-in user
//! - [`SqliteBackend`] / [`MemoryBackend`]: repository implementations

pub mod auth;
pub mod board;
pub mod error;
pub mod events;
pub mod profile;
pub mod repository;
pub mod storage;
pub mod store;
pub mod task;
pub mod timer;
pub mod workspace;

pub use auth::{AuthProvider, LocalAuth};
pub use board::{BoardSummary, Column};
pub use error::{
    AuthError, ConfigError, CoreError, DatabaseError, Recovery, RepositoryError, TaskSyncError,
    TimerError, ValidationError,
};
pub use events::Event;
pub use profile::{CognitivePreferences, NavigationProfile, ProfileConfig, UserInfo, UserProfileStore};
pub use repository::{MemoryBackend, SessionRepository, SqliteBackend, TaskRepository, UserRepository};
pub use storage::{Config, Database};
pub use store::TaskStore;
pub use task::{NewTask, Task, TaskPatch, TaskStatus};
pub use timer::{
    spawn_focus_forwarder, Phase, PhasePlan, PomodoroEngine, PomodoroHandle, PomodoroRunner,
    TimerSnapshot,
};
pub use workspace::Workspace;
