//! Task management commands for CLI.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use focusboard_core::task::{parse_tags, CognitiveLoad, OrderUpdate};
use focusboard_core::{Config, NewTask, Task, TaskPatch, TaskStatus};

use crate::app::{print_json, App};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List tasks in board order
    List {
        /// Only tasks with this status (todo, doing, done)
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        json: bool,
    },
    /// Show one task
    Show {
        /// Task ID or unique prefix
        id: String,
    },
    /// Create a task
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Estimated pomodoros (default from config)
        #[arg(long)]
        estimate: Option<u32>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Cognitive load: low, medium or high (default from config)
        #[arg(long)]
        load: Option<CognitiveLoad>,
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// Due date, YYYY-MM-DD or RFC 3339
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Move a task to another column
    Move {
        id: String,
        status: TaskStatus,
    },
    /// Edit task fields
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New description; an empty value clears it
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        load: Option<CognitiveLoad>,
        /// Due date, or "none" to clear it
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete a task
    Delete {
        id: String,
    },
    /// Set positions, e.g. `reorder a1=0 b2=1`
    Reorder {
        #[arg(required = true)]
        positions: Vec<String>,
    },
    /// Add a checklist item
    SubtaskAdd {
        id: String,
        title: String,
    },
    /// Toggle a checklist item
    SubtaskToggle {
        id: String,
        subtask_id: String,
    },
}

pub async fn run(action: TaskAction, config: Config) -> CliResult {
    let app = App::open(config).await?;
    app.require_user()?;
    let store = app.tasks();

    match action {
        TaskAction::List { status, json } => {
            let tasks: Vec<Task> = store
                .tasks()
                .into_iter()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .collect();
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("no tasks");
            } else {
                for task in &tasks {
                    print_line(task);
                }
            }
        }
        TaskAction::Show { id } => {
            let task = find(&app, &id)?;
            print_json(&task)?;
        }
        TaskAction::Add {
            title,
            description,
            estimate,
            tags,
            load,
            status,
            due,
            json,
        } => {
            let mut new_task = NewTask::new(title);
            new_task.description = description;
            new_task.estimated_pomodoros = estimate.unwrap_or(app.config.board.default_estimate);
            new_task.tags = tags.as_deref().map(parse_tags).unwrap_or_default();
            new_task.cognitive_load = load.unwrap_or(app.config.board.default_cognitive_load);
            new_task.status = status;
            new_task.due_date = due.as_deref().map(parse_due).transpose()?;

            let task = store.create(new_task).await?;
            if json {
                print_json(&task)?;
            } else {
                println!("Task created: {}", task.id);
            }
        }
        TaskAction::Move { id, status } => {
            let task = find(&app, &id)?;
            store.move_task(&task.id, status).await?;
            println!("{} -> {}", task.id, status);
        }
        TaskAction::Edit {
            id,
            title,
            description,
            estimate,
            tags,
            load,
            due,
        } => {
            let task = find(&app, &id)?;
            let due_date = match due.as_deref() {
                None => None,
                Some("none") => Some(None),
                Some(raw) => Some(Some(parse_due(raw)?)),
            };
            let patch = TaskPatch {
                title,
                description: description.map(|d| Some(d).filter(|d| !d.trim().is_empty())),
                estimated_pomodoros: estimate,
                tags: tags.as_deref().map(parse_tags),
                cognitive_load: load,
                due_date,
                ..TaskPatch::default()
            };
            if patch.is_empty() {
                return Err("nothing to change".into());
            }
            store.edit(&task.id, patch).await?;
            println!("updated {}", task.id);
        }
        TaskAction::Delete { id } => {
            let task = find(&app, &id)?;
            store.delete(&task.id).await?;
            println!("deleted {}", task.id);
        }
        TaskAction::Reorder { positions } => {
            let mut updates = Vec::with_capacity(positions.len());
            for position in &positions {
                let (id, order) = position
                    .split_once('=')
                    .ok_or_else(|| format!("expected ID=ORDER, got `{position}`"))?;
                let order: i64 = order
                    .parse()
                    .map_err(|_| format!("invalid order in `{position}`"))?;
                updates.push(OrderUpdate {
                    id: find(&app, id)?.id,
                    order,
                });
            }
            store.reorder(updates).await?;
            println!("reordered {} task(s)", positions.len());
        }
        TaskAction::SubtaskAdd { id, title } => {
            let task = find(&app, &id)?;
            let subtask = store.add_subtask(&task.id, &title).await?;
            println!("Subtask created: {}", subtask.id);
        }
        TaskAction::SubtaskToggle { id, subtask_id } => {
            let task = find(&app, &id)?;
            store.toggle_subtask(&task.id, &subtask_id).await?;
            println!("toggled {subtask_id}");
        }
    }
    Ok(())
}

/// Resolve a full id or a unique id prefix.
pub fn find(app: &App, id: &str) -> CliResult<Task> {
    let tasks = app.tasks().tasks();
    if let Some(task) = tasks.iter().find(|t| t.id == id) {
        return Ok(task.clone());
    }
    let mut matches = tasks.into_iter().filter(|t| t.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task),
        (Some(_), Some(_)) => Err(format!("task id `{id}` is ambiguous").into()),
        (None, _) => Err(format!("no task with id `{id}`").into()),
    }
}

fn parse_due(raw: &str) -> CliResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| format!("invalid due date `{raw}`").into())
}

fn print_line(task: &Task) {
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", task.tags.join(" #"))
    };
    println!(
        "{:<5} {}  {} [{}/{}] {}{}",
        task.status.as_str(),
        task.id,
        task.title,
        task.completed_pomodoros,
        task.estimated_pomodoros,
        task.cognitive_load,
        tags
    );
}
