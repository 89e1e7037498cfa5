use clap::Args;
use colored::Colorize;
use pomodoro_core::{
    Config, CoreError, Database, IntervalTicks, RunEvent, RunPlan, RunSummary, SessionCoordinator,
};
use serde_json::json;
use tokio::sync::{mpsc, watch};

use super::CliResult;
use crate::render::{print_json, print_session, ProgressRenderer};

#[derive(Args)]
pub struct StartArgs {
    /// Task description
    #[arg(short, long)]
    task: String,
    /// Work duration in minutes
    #[arg(short, long)]
    work: Option<u64>,
    /// Break duration in minutes (0 skips breaks)
    #[arg(short = 'b', long = "break")]
    break_minutes: Option<u64>,
    /// Number of work+break cycles
    #[arg(short, long)]
    cycles: Option<u32>,
}

fn coordinator() -> Result<SessionCoordinator<Database>, CoreError> {
    Ok(SessionCoordinator::new(Database::open()?))
}

pub fn start(args: StartArgs, config: &Config, json: bool) -> CliResult {
    let work_minutes = args.work.unwrap_or(config.timer.work_minutes);
    let break_minutes = args.break_minutes.unwrap_or(config.timer.break_minutes);
    let cycles = args.cycles.unwrap_or(config.timer.cycles);
    let plan = RunPlan::from_minutes(args.task, work_minutes, break_minutes, cycles);

    let mut coordinator = coordinator()?;
    let record_id = match coordinator.begin_run(plan.clone()) {
        Ok(id) => id,
        Err(CoreError::SessionAlreadyActive(session)) => {
            if json {
                print_json(&json!({
                    "error": "A session is already running",
                    "session": session,
                }))?;
            }
            return Err(CoreError::SessionAlreadyActive(session).into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&json!({
            "status": "started",
            "session_id": record_id,
            "task": plan.task,
            "work_minutes": work_minutes,
            "break_minutes": break_minutes,
            "cycles": cycles,
        }))?;
    } else {
        println!("{}", "✓ Pomodoro session started!".green());
        println!("Task: {}", plan.task.bold());
        if cycles > 1 {
            println!("Work: {work_minutes} min | Break: {break_minutes} min | Cycles: {cycles}");
        } else {
            println!("Work: {work_minutes} min");
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(drive(&mut coordinator, json))?;

    if json {
        print_json(&summary)?;
    }
    Ok(())
}

/// Run the coordination loop with real-time ticks, Ctrl-C as the stop
/// signal and a renderer draining the event channel.
async fn drive(
    coordinator: &mut SessionCoordinator<Database>,
    json: bool,
) -> Result<RunSummary, CoreError> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<RunEvent>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping run");
            stop_tx.send_replace(true);
        }
    });

    let printer = tokio::spawn(async move {
        let mut renderer = ProgressRenderer::new(json);
        while let Some(event) = events_rx.recv().await {
            renderer.render(&event);
        }
    });

    let mut ticks = IntervalTicks::every_second();
    let summary = coordinator.run(&mut ticks, stop_rx, events_tx).await?;
    // The sender went away with `run`, so the printer drains and exits.
    let _ = printer.await;
    Ok(summary)
}

pub fn stop(json: bool) -> CliResult {
    let mut coordinator = coordinator()?;
    let session = match coordinator.close_open_session() {
        Ok(session) => session,
        Err(CoreError::NoActiveSession) => {
            if json {
                print_json(&json!({ "error": "No active session" }))?;
            }
            return Err(CoreError::NoActiveSession.into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&json!({
            "status": "stopped",
            "session_id": session.id,
            "task": session.task,
        }))?;
    } else {
        println!("{}", "⏹ Session stopped".yellow());
        println!("Task: {}", session.task);
    }
    Ok(())
}

pub fn status(json: bool) -> CliResult {
    let coordinator = coordinator()?;
    let current = coordinator.current_status()?;

    if json {
        print_json(&json!({
            "running": current.is_some(),
            "session": current,
        }))?;
        return Ok(());
    }

    match current {
        Some(session) => {
            println!("{}", "✓ Session running".green());
            print_session(&session);
        }
        None => println!("{}", "No active session".dimmed()),
    }
    Ok(())
}
