use clap::Args;
use colored::Colorize;
use pomodoro_core::{Config, Database, SessionCoordinator};

use super::CliResult;
use crate::render::{local_time, print_json};

#[derive(Args)]
pub struct HistoryArgs {
    /// Number of days to look back
    #[arg(short, long)]
    days: Option<u32>,
    /// Maximum number of sessions to show
    #[arg(short, long)]
    limit: Option<usize>,
}

pub fn run(args: HistoryArgs, config: &Config, json: bool) -> CliResult {
    let days = args.days.unwrap_or(config.history.days);
    let limit = args.limit.unwrap_or(config.history.limit);
    let coordinator = SessionCoordinator::new(Database::open()?);
    let sessions = coordinator.history(days, limit)?;

    if json {
        print_json(&sessions)?;
        return Ok(());
    }

    if sessions.is_empty() {
        println!("{}", "No sessions found".dimmed());
        return Ok(());
    }

    println!("{}", format!("\nPomodoro History (last {days} days):").bold());
    let task_width = sessions
        .iter()
        .map(|s| s.task.chars().count())
        .max()
        .unwrap_or(0)
        .max("Task".len());
    println!("{:<16}  {:<task_width$}  Status", "Date", "Task");
    println!("{}", "-".repeat(16 + 2 + task_width + 2 + "Incomplete".len()));
    for session in &sessions {
        let status = if session.is_open() {
            "Incomplete".yellow()
        } else {
            "Completed".green()
        };
        println!(
            "{:<16}  {:<task_width$}  {status}",
            local_time(session.started_at),
            session.task
        );
    }
    Ok(())
}
