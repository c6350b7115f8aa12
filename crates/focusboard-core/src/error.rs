//! Core error types for focusboard-core.
//!
//! Every concern gets its own `thiserror` enum; [`CoreError`] wraps them for
//! callers that only need to report a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusboard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Repository (remote store) errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Task synchronization errors
    #[error(transparent)]
    TaskSync(#[from] TaskSyncError),

    /// Timer actor errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is blank after trimming
    #[error("'{field}' must not be empty")]
    Blank { field: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Unrecognized enumerated value
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: String, value: String },
}

/// Failures reported by a repository backend.
///
/// Backends map their own failures onto these; the task store only cares
/// that a call failed, the variants exist for logging and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No record with this id
    #[error("record not found: {0}")]
    NotFound(String),

    /// The store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because it conflicts with existing data
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend storage failure
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Classified authentication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must have at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("user not found")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("email already registered")]
    EmailInUse,

    #[error("too many attempts")]
    TooManyRequests,

    #[error("network failure: {0}")]
    Network(String),

    #[error("credential storage failure: {0}")]
    Storage(String),
}

impl AuthError {
    /// Message suitable for showing to the person signing in.
    ///
    /// Unknown-user and wrong-password collapse into the same text so the
    /// message does not reveal which accounts exist.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail => "Invalid email",
            AuthError::WeakPassword { .. } => "Weak password (at least 6 characters)",
            AuthError::UserNotFound | AuthError::WrongPassword => "Invalid email or password",
            AuthError::EmailInUse => "This email is already registered",
            AuthError::TooManyRequests => "Too many attempts. Try again later",
            AuthError::Network(_) => "Connection error. Check your internet",
            AuthError::Storage(_) => "Something went wrong. Try again",
        }
    }
}

/// Failures talking to the timer actor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The actor has shut down and no longer accepts commands
    #[error("timer has stopped")]
    Stopped,
}

/// Which local repair was applied after a remote write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The optimistic change was undone locally (temporary entry removed or
    /// pre-mutation snapshot restored).
    RolledBack,
    /// The optimistic change was kept and a full reload replaced the list
    /// with server truth.
    Reloaded,
    /// A full reload was attempted and also failed; the list still holds the
    /// optimistic change.
    ReloadFailed,
    /// The signed-in user changed while the call was in flight; nothing was
    /// touched.
    Discarded,
}

/// Errors surfaced by the optimistic task store.
#[derive(Error, Debug)]
pub enum TaskSyncError {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not load tasks: {source}")]
    Load {
        #[source]
        source: RepositoryError,
    },

    #[error("could not create task: {source}")]
    Create {
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },

    #[error("could not move task {task_id}: {source}")]
    Move {
        task_id: String,
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },

    #[error("could not update task {task_id}: {source}")]
    Edit {
        task_id: String,
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },

    #[error("could not delete task {task_id}: {source}")]
    Delete {
        task_id: String,
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },

    #[error("could not reorder tasks: {source}")]
    Reorder {
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },

    #[error("could not record pomodoro for task {task_id}: {source}")]
    Increment {
        task_id: String,
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },

    #[error("could not update subtasks of task {task_id}: {source}")]
    Subtasks {
        task_id: String,
        #[source]
        source: RepositoryError,
        recovery: Recovery,
    },
}

impl TaskSyncError {
    /// The local repair that was applied, if the failure came from a remote
    /// write.
    pub fn recovery(&self) -> Option<Recovery> {
        match self {
            TaskSyncError::Create { recovery, .. }
            | TaskSyncError::Move { recovery, .. }
            | TaskSyncError::Edit { recovery, .. }
            | TaskSyncError::Delete { recovery, .. }
            | TaskSyncError::Reorder { recovery, .. }
            | TaskSyncError::Increment { recovery, .. }
            | TaskSyncError::Subtasks { recovery, .. } => Some(*recovery),
            _ => None,
        }
    }

    /// Whether the caller must show this failure to the user.
    ///
    /// Destructive operations (create, delete) and load failures are
    /// user-facing; resynced mutations only show up as the list snapping
    /// back to server truth.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            TaskSyncError::Move { .. }
                | TaskSyncError::Edit { .. }
                | TaskSyncError::Reorder { .. }
                | TaskSyncError::Increment { .. }
                | TaskSyncError::Subtasks { .. }
        )
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Locked => RepositoryError::Unavailable(err.to_string()),
            other => RepositoryError::Storage(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resynced_failures_are_not_user_facing() {
        let err = TaskSyncError::Move {
            task_id: "t1".into(),
            source: RepositoryError::Unavailable("offline".into()),
            recovery: Recovery::Reloaded,
        };
        assert!(!err.is_user_facing());
        assert_eq!(err.recovery(), Some(Recovery::Reloaded));
    }

    #[test]
    fn destructive_failures_are_user_facing() {
        let err = TaskSyncError::Delete {
            task_id: "t1".into(),
            source: RepositoryError::Unavailable("offline".into()),
            recovery: Recovery::RolledBack,
        };
        assert!(err.is_user_facing());
        assert!(TaskSyncError::NotSignedIn.recovery().is_none());
    }

    #[test]
    fn auth_messages_do_not_leak_account_existence() {
        assert_eq!(
            AuthError::UserNotFound.user_message(),
            AuthError::WrongPassword.user_message()
        );
    }

    #[test]
    fn locked_database_maps_to_unavailable() {
        let repo: RepositoryError = DatabaseError::Locked.into();
        assert!(matches!(repo, RepositoryError::Unavailable(_)));
    }
}
