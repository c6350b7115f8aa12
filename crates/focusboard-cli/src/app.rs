//! Per-invocation context: storage, sign-in and the stores.

use std::error::Error;
use std::sync::Arc;

use focusboard_core::{
    AuthProvider, Config, CoreError, LocalAuth, SqliteBackend, TaskStore, UserProfileStore,
    Workspace,
};

pub struct App {
    pub backend: Arc<SqliteBackend>,
    pub workspace: Arc<Workspace>,
    pub config: Config,
}

impl App {
    /// Open the database in the data directory and load the stores for the
    /// persisted sign-in, if any.
    pub async fn open(config: Config) -> Result<Self, CoreError> {
        let backend = Arc::new(SqliteBackend::open_default()?);
        let auth: Arc<dyn AuthProvider> = Arc::new(LocalAuth::restore(backend.clone()).await?);
        let workspace = Arc::new(Workspace::new(
            auth,
            Arc::new(TaskStore::new(backend.clone())),
            Arc::new(UserProfileStore::new(backend.clone())),
        ));
        workspace.restore().await?;
        Ok(Self {
            backend,
            workspace,
            config,
        })
    }

    pub fn tasks(&self) -> &Arc<TaskStore> {
        self.workspace.tasks()
    }

    pub fn profiles(&self) -> &Arc<UserProfileStore> {
        self.workspace.profiles()
    }

    pub fn require_user(&self) -> Result<String, Box<dyn Error>> {
        self.workspace
            .current_user_id()
            .ok_or_else(|| "not signed in (run `focusboard auth login`)".into())
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
