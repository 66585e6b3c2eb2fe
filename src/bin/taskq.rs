//! taskq CLI: one queue operation per invocation.

use anyhow::Context;
use clap::{Parser, Subcommand};
use taskq::config::Config;
use taskq::duration::format_duration_with_seconds;
use taskq::model::Task;
use taskq::telemetry::{TelemetryConfig, init_telemetry};
use taskq::{Engine, Toggled};

#[derive(Parser)]
#[command(name = "taskq", about = "Rotating personal work queue")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current task, its time, and the queue size (default)
    Status,
    /// Add a task to the back of the queue
    Add {
        /// Task name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// List the queue, head first
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Start or pause work on the current task
    Toggle,
    /// Pause the current task and move it to the back of the queue
    Next,
    /// Delete the current task (undoable until the next destructive command)
    Delete,
    /// Restore deleted tasks
    Undo,
    /// Rename the current task
    Rename {
        /// New name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Show recorded work sessions for the current task
    History,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _telemetry = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "taskq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let mut engine = Engine::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {}
        Command::Add { name } => {
            engine.cleanup_deleted_tasks()?;
            let task = engine.add(&name.join(" "))?;
            println!("Added: {}", task.name);
        }
        Command::List { json } => return cmd_list(&engine, json),
        Command::Toggle => {
            let task = require_current(&engine)?;
            engine.cleanup_deleted_tasks()?;
            match engine.toggle_session(task.id)? {
                Toggled::Started(_) => println!("Started: {}", task.name),
                Toggled::Paused(session) => {
                    let seconds = session.end_time.map_or(0, |end| session.elapsed_seconds(end));
                    println!(
                        "Paused: {} after {}",
                        task.name,
                        format_duration_with_seconds(seconds)
                    );
                }
            }
        }
        Command::Next => {
            let task = require_current(&engine)?;
            engine.cleanup_deleted_tasks()?;
            engine.rotate_with_pause(task.id)?;
        }
        Command::Delete => {
            let task = require_current(&engine)?;
            engine.cleanup_deleted_tasks()?;
            engine.delete_with_pause(task.id)?;
            println!("Deleted: {} (run `taskq undo` to restore)", task.name);
        }
        Command::Undo => {
            let restored = engine.undo_delete()?;
            println!("Restored {restored} task(s)");
        }
        Command::Rename { name } => {
            let task = require_current(&engine)?;
            let renamed = engine.rename(task.id, &name.join(" "))?;
            println!("Renamed: {} -> {}", task.name, renamed.name);
        }
        Command::History => return cmd_history(&engine),
    }

    print_status(&engine)
}

fn require_current(engine: &Engine) -> anyhow::Result<Task> {
    engine
        .current_task()?
        .context("no tasks in queue; add one with `taskq add <name>`")
}

fn print_status(engine: &Engine) -> anyhow::Result<()> {
    match engine.current_task()? {
        Some(task) => {
            let summary = engine.time_summary(task.id)?;
            let marker = if summary.is_running() { "▶" } else { "⏸" };
            println!("{marker} {}", task.name);
            println!("{summary}");
        }
        None => println!("No tasks in queue"),
    }

    println!("Tasks: {}", engine.queue_size()?);
    if engine.has_deleted_task()? {
        println!("(undo available)");
    }
    Ok(())
}

fn cmd_list(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let tasks = engine.all_tasks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks in queue");
        return Ok(());
    }

    println!("{:<6} {:<8} NAME", "ID", "ORDER");
    for task in &tasks {
        println!("{:<6} {:<8} {}", task.id.0, task.queue_order, task.name);
    }
    println!("\n{} task(s)", tasks.len());
    Ok(())
}

fn cmd_history(engine: &Engine) -> anyhow::Result<()> {
    let task = require_current(engine)?;
    let sessions = engine.sessions(task.id)?;

    if sessions.is_empty() {
        println!("No work recorded for {}", task.name);
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("{:<22} {:<22} DURATION", "START", "END");
    for session in &sessions {
        let start = session.start_time.with_timezone(&chrono::Local);
        let end = session
            .end_time
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "(running)".to_string());
        println!(
            "{:<22} {:<22} {}",
            start.format("%Y-%m-%d %H:%M:%S"),
            end,
            format_duration_with_seconds(session.elapsed_seconds(now))
        );
    }
    Ok(())
}
