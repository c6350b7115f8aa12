use clap::Subcommand;
use focusboard_core::board::{self, BoardSummary};
use focusboard_core::Config;

use crate::app::{print_json, App};

#[derive(Subcommand)]
pub enum BoardAction {
    /// Dashboard counters
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Kanban columns visible for the current profile
    Columns {
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: BoardAction, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open(config).await?;
    app.require_user()?;
    let tasks = app.tasks().tasks();

    match action {
        BoardAction::Summary { json } => {
            let summary = BoardSummary::from_tasks(&tasks);
            if json {
                return print_json(&summary);
            }
            println!("todo:  {}", summary.todo);
            println!("doing: {}", summary.doing);
            println!("done:  {}", summary.done);
            println!("pomodoros completed: {}", summary.completed_pomodoros);
            if summary.active_high_load > 0 {
                println!("high cognitive load tasks open: {}", summary.active_high_load);
            }
        }
        BoardAction::Columns { json } => {
            let columns = board::columns(&tasks, app.profiles().profile_config());
            if json {
                return print_json(&columns);
            }
            for column in &columns {
                let warning = if column.is_at_limit() { "  (limit reached)" } else { "" };
                println!("{} [{}]{}", column.status, column.count_label(), warning);
                for task in &column.tasks {
                    println!("  {}  {}", task.id, task.title);
                }
            }
        }
    }
    Ok(())
}
