use clap::Subcommand;
use focusboard_core::{
    spawn_focus_forwarder, Config, Event, PomodoroEngine, PomodoroRunner, TaskStatus,
};
use tokio::sync::broadcast::error::RecvError;

use crate::app::{print_json, App};
use crate::commands::task::find;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer in the foreground
    Run {
        /// Task to bind the focus phases to
        #[arg(long)]
        task: Option<String>,
        /// Number of phases to run back to back
        #[arg(long, default_value_t = 1)]
        phases: u32,
        /// Complete each phase as soon as it starts
        #[arg(long)]
        instant: bool,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show the configured phase durations
    Plan,
}

pub async fn run(action: TimerAction, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Plan => print_json(&config.phase_plan()),
        TimerAction::Run {
            task,
            phases,
            instant,
            json,
        } => {
            let app = App::open(config).await?;
            run_phases(&app, task, phases, instant, json).await
        }
    }
}

async fn run_phases(
    app: &App,
    task: Option<String>,
    phases: u32,
    instant: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let task_id = match task {
        Some(id) => {
            app.require_user()?;
            let task = find(app, &id)?;
            if task.status == TaskStatus::Done {
                return Err(format!("task {} is already done", task.id).into());
            }
            Some(task.id)
        }
        None => None,
    };

    let runner = PomodoroRunner::spawn(
        PomodoroEngine::new(app.config.phase_plan()),
        app.backend.clone(),
    );
    let timer = runner.handle();
    let mut events = timer.subscribe();
    let forwarder = spawn_focus_forwarder(app.tasks().clone(), timer.subscribe());

    timer.set_user(app.workspace.current_user_id()).await?;
    timer.bind_task(task_id).await?;

    for _ in 0..phases {
        timer.start().await?;
        if instant {
            timer.complete().await?;
        }
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err("timer stopped unexpectedly".into()),
            };
            render(&event, json)?;
            if matches!(event, Event::PhaseCompleted { .. }) {
                break;
            }
        }
    }

    let snapshot = timer.snapshot().await?;
    runner.shutdown().await;
    drop(timer);
    forwarder.await?;

    if !json {
        println!(
            "next: {} ({} focus session(s) completed)",
            snapshot.phase, snapshot.completed_focus_count
        );
    }
    Ok(())
}

fn render(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::TimerStarted {
            phase, seconds_left, ..
        } => println!("{phase} started, {}", clock(*seconds_left)),
        Event::TimerTicked {
            phase, seconds_left,
        } if seconds_left % 60 == 0 => println!("{phase} {}", clock(*seconds_left)),
        Event::PhaseCompleted { phase, next, .. } => println!("{phase} completed, next is {next}"),
        Event::FocusCompleted {
            task_id: Some(task_id),
            ..
        } => println!("pomodoro recorded for {task_id}"),
        Event::TaskBound {
            task_id: Some(task_id),
            ..
        } => println!("bound to {task_id}"),
        _ => {}
    }
    Ok(())
}

fn clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_minutes_and_seconds() {
        assert_eq!(clock(1500), "25:00");
        assert_eq!(clock(65), "01:05");
        assert_eq!(clock(0), "00:00");
    }
}
