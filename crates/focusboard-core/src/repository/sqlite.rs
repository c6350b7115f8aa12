//! Durable backend on SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{SessionLog, SessionRepository, TaskRepository, UserRepository};
use crate::auth::{Account, CredentialStore};
use crate::error::{CoreError, DatabaseError, RepositoryError};
use crate::profile::{CognitivePrefsPatch, UserInfo, UserInfoPatch};
use crate::storage::Database;
use crate::task::{NewTask, OrderUpdate, Task, TaskPatch};
use crate::timer::Phase;

const ACTIVE_USER_KEY: &str = "auth.active_user";

const TASK_COLUMNS: &str = "id, user_id, title, description, status, estimated_pomodoros,
     completed_pomodoros, tags, cognitive_load, subtasks, sort_order, created_at, due_date";

/// Repository backend storing everything in one SQLite database.
pub struct SqliteBackend {
    db: Mutex<Database>,
}

impl SqliteBackend {
    /// Backend on `focusboard.db` in the data directory.
    pub fn open_default() -> Result<Self, CoreError> {
        Ok(Self::from_database(Database::open_default()?))
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_database(Database::open(path)?))
    }

    pub fn open_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_database(Database::open_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session records of `user_id`, oldest first.
    pub fn sessions(&self, user_id: &str) -> Result<Vec<SessionLog>, RepositoryError> {
        let db = self.db();
        let mut stmt = db.conn().prepare(
            "SELECT id, user_id, task_id, phase, started_at, ended_at, duration_min, completed
             FROM sessions WHERE user_id = ?1 ORDER BY started_at",
        )?;
        let rows = stmt.query_map(params![user_id], session_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn load_task(db: &Database, id: &str) -> Result<Option<Task>, RepositoryError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        Ok(db
            .conn()
            .query_row(&sql, params![id], task_from_row)
            .optional()?)
    }

    fn load_user(db: &Database, user_id: &str) -> Result<Option<UserInfo>, RepositoryError> {
        let json: Option<String> = db
            .conn()
            .query_row(
                "SELECT info FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(json_error))
            .transpose()
    }

    fn store_user(db: &Database, info: &UserInfo) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(info).map_err(json_error)?;
        db.conn().execute(
            "INSERT OR REPLACE INTO users (id, info) VALUES (?1, ?2)",
            params![info.id, json],
        )?;
        Ok(())
    }
}

fn json_error(err: serde_json::Error) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion_error(idx, e))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(4)?;
    let tags: String = row.get(7)?;
    let load: String = row.get(8)?;
    let subtasks: String = row.get(9)?;
    let created_at: String = row.get(11)?;
    let due_date: Option<String> = row.get(12)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: status.parse().map_err(|e| conversion_error(4, e))?,
        estimated_pomodoros: row.get(5)?,
        completed_pomodoros: row.get(6)?,
        tags: parse_json(7, &tags)?,
        cognitive_load: load.parse().map_err(|e| conversion_error(8, e))?,
        subtasks: parse_json(9, &subtasks)?,
        order: row.get(10)?,
        created_at: parse_time(11, &created_at)?,
        due_date: due_date.map(|d| parse_time(12, &d)).transpose()?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionLog> {
    let phase: String = row.get(3)?;
    let started_at: String = row.get(4)?;
    let ended_at: Option<String> = row.get(5)?;
    Ok(SessionLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        phase: phase.parse::<Phase>().map_err(|e| conversion_error(3, e))?,
        started_at: parse_time(4, &started_at)?,
        ended_at: ended_at.map(|t| parse_time(5, &t)).transpose()?,
        duration_min: row.get(6)?,
        completed: row.get(7)?,
    })
}

fn write_task(db: &Database, task: &Task) -> Result<(), RepositoryError> {
    let tags = serde_json::to_string(&task.tags).map_err(json_error)?;
    let subtasks = serde_json::to_string(&task.subtasks).map_err(json_error)?;
    db.conn().execute(
        "INSERT OR REPLACE INTO tasks (id, user_id, title, description, status,
             estimated_pomodoros, completed_pomodoros, tags, cognitive_load, subtasks,
             sort_order, created_at, due_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            task.id,
            task.user_id,
            task.title,
            task.description,
            task.status.as_str(),
            task.estimated_pomodoros,
            task.completed_pomodoros,
            tags,
            task.cognitive_load.as_str(),
            subtasks,
            task.order,
            task.created_at.to_rfc3339(),
            task.due_date.map(|d| d.to_rfc3339()),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl TaskRepository for SqliteBackend {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Task>, RepositoryError> {
        let db = self.db();
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1");
        let mut stmt = db.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], task_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn create(&self, user_id: &str, task: NewTask) -> Result<Task, RepositoryError> {
        let task = task.into_task(
            uuid::Uuid::new_v4().to_string(),
            user_id.to_string(),
            Utc::now(),
        );
        write_task(&self.db(), &task)?;
        Ok(task)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<(), RepositoryError> {
        let db = self.db();
        let mut task =
            Self::load_task(&db, id)?.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        patch.apply_to(&mut task);
        write_task(&db, &task)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let changed = self
            .db()
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn batch_update_order(&self, updates: &[OrderUpdate]) -> Result<(), RepositoryError> {
        let mut db = self.db();
        let tx = db.conn_mut().transaction()?;
        for update in updates {
            let changed = tx.execute(
                "UPDATE tasks SET sort_order = ?1 WHERE id = ?2",
                params![update.order, update.id],
            )?;
            if changed == 0 {
                // Dropping the transaction rolls back the earlier updates.
                return Err(RepositoryError::NotFound(update.id.clone()));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for SqliteBackend {
    async fn start_session(
        &self,
        user_id: &str,
        task_id: &str,
        phase: Phase,
    ) -> Result<String, RepositoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db().conn().execute(
            "INSERT INTO sessions (id, user_id, task_id, phase, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, user_id, task_id, phase.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    async fn complete_session(
        &self,
        session_id: &str,
        duration_min: u32,
    ) -> Result<(), RepositoryError> {
        let changed = self.db().conn().execute(
            "UPDATE sessions SET ended_at = ?1, duration_min = ?2, completed = 1 WHERE id = ?3",
            params![Utc::now().to_rfc3339(), duration_min, session_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(session_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteBackend {
    async fn get_or_create(
        &self,
        user_id: &str,
        defaults: &UserInfo,
    ) -> Result<UserInfo, RepositoryError> {
        let db = self.db();
        if let Some(info) = Self::load_user(&db, user_id)? {
            return Ok(info);
        }
        let mut info = defaults.clone();
        info.id = user_id.to_string();
        Self::store_user(&db, &info)?;
        Ok(info)
    }

    async fn update_cognitive_prefs(
        &self,
        user_id: &str,
        patch: &CognitivePrefsPatch,
    ) -> Result<(), RepositoryError> {
        let db = self.db();
        let Some(mut info) = Self::load_user(&db, user_id)? else {
            return Ok(());
        };
        info.cognitive_preferences.apply(patch);
        Self::store_user(&db, &info)
    }

    async fn update_user_info(
        &self,
        user_id: &str,
        patch: &UserInfoPatch,
    ) -> Result<(), RepositoryError> {
        let db = self.db();
        let mut info = Self::load_user(&db, user_id)?
            .ok_or_else(|| RepositoryError::NotFound(user_id.to_string()))?;
        patch.apply_to(&mut info);
        Self::store_user(&db, &info)
    }
}

#[async_trait]
impl CredentialStore for SqliteBackend {
    async fn find_account(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let db = self.db();
        let row = db
            .conn()
            .query_row(
                "SELECT user_id, email, salt, password_digest, created_at
                 FROM accounts WHERE email = ?1",
                params![email],
                |row| {
                    let created_at: String = row.get(4)?;
                    Ok(Account {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        salt: row.get(2)?,
                        password_digest: row.get(3)?,
                        created_at: parse_time(4, &created_at)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), RepositoryError> {
        let result = self.db().conn().execute(
            "INSERT INTO accounts (email, user_id, salt, password_digest, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.email,
                account.user_id,
                account.salt,
                account.password_digest,
                account.created_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(RepositoryError::Conflict(account.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn active_user(&self) -> Result<Option<String>, RepositoryError> {
        Ok(self.db().kv_get(ACTIVE_USER_KEY)?)
    }

    async fn set_active_user(&self, user_id: Option<&str>) -> Result<(), RepositoryError> {
        let db = self.db();
        match user_id {
            Some(id) => db.kv_set(ACTIVE_USER_KEY, id)?,
            None => db.kv_delete(ACTIVE_USER_KEY)?,
        }
        Ok(())
    }
}
