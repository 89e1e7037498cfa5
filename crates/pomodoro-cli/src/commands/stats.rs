use clap::Args;
use colored::Colorize;
use pomodoro_core::{Database, SessionCoordinator, StatsPeriod};
use serde_json::json;

use super::CliResult;
use crate::render::{plural, print_json};

#[derive(Args)]
pub struct StatsArgs {
    /// Analysis period (day/week/month/year)
    #[arg(short, long, default_value = "week")]
    period: StatsPeriod,
}

pub fn run(args: StatsArgs, json: bool) -> CliResult {
    let coordinator = SessionCoordinator::new(Database::open()?);
    let stats = coordinator.stats(args.period)?;

    if json {
        let mut value = serde_json::to_value(&stats)?;
        value["period"] = json!(args.period);
        print_json(&value)?;
        return Ok(());
    }

    println!("{}", format!("\nPomodoro Statistics ({}):\n", args.period).bold());
    println!("{} {}", "Total Sessions:".green(), stats.total_count);
    println!("{} {}", "Completed:".green(), stats.completed_count);
    println!("{} {}", "Incomplete:".yellow(), stats.incomplete_count);
    println!("{} {:.1}%", "Completion Rate:".blue(), stats.completion_rate);
    println!(
        "{} {} minutes",
        "Total Focus Time:".cyan(),
        stats.focus_minutes
    );

    if !stats.counts_by_hour_of_day.is_empty() {
        println!("\n{}", "Most Productive Hours:".bold());
        for bucket in &stats.counts_by_hour_of_day {
            println!("  {:02}:00 - {}", bucket.hour, plural(bucket.count, "session"));
        }
    }

    if !stats.counts_by_task.is_empty() {
        println!("\n{}", "Top Tasks:".bold());
        for bucket in &stats.counts_by_task {
            println!("  {} - {}", bucket.task, plural(bucket.count, "session"));
        }
    }
    Ok(())
}
