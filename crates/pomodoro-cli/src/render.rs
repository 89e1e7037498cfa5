//! Text and JSON rendering for command output.

use std::io::Write;

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use pomodoro_core::timer::format_remaining;
use pomodoro_core::{PhaseKind, PhaseSnapshot, RunEvent, SchedulerEvent, SessionRecord};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

pub fn print_session(record: &SessionRecord) {
    println!("Task: {}", record.task.bold());
    println!("Started: {}", local_time(record.started_at));
    println!("Duration: {}", plural(record.duration_secs / 60, "minute"));
}

/// The progress line for a tick, or `None` off a minute boundary.
pub fn format_progress(snapshot: &PhaseSnapshot) -> Option<String> {
    if snapshot.remaining_secs % 60 != 0 {
        return None;
    }
    let mode = match snapshot.phase_kind {
        PhaseKind::Work => "Work",
        PhaseKind::Break => "Break",
    };
    let cycle_info = if snapshot.total_cycles > 1 {
        format!(" (Cycle {}/{})", snapshot.cycle_index, snapshot.total_cycles)
    } else {
        String::new()
    };
    Some(format!(
        "⏱  {mode}{cycle_info}: {} remaining",
        format_remaining(snapshot.remaining_secs)
    ))
}

/// One compact JSON object per event; ticks only on minute boundaries.
fn json_line(event: &RunEvent) -> Option<String> {
    if let RunEvent::Timer {
        event: SchedulerEvent::Tick(snapshot),
    } = event
    {
        if snapshot.remaining_secs % 60 != 0 {
            return None;
        }
    }
    serde_json::to_string(event).ok()
}

/// Renders coordination-loop events as they arrive.
///
/// Text mode redraws a single progress line once per minute; JSON mode emits
/// one compact object per line for the same events.
pub struct ProgressRenderer {
    json: bool,
}

impl ProgressRenderer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn render(&mut self, event: &RunEvent) {
        if self.json {
            self.render_json(event);
        } else {
            self.render_text(event);
        }
    }

    fn render_json(&self, event: &RunEvent) {
        if let Some(line) = json_line(event) {
            println!("{line}");
        }
    }

    fn render_text(&self, event: &RunEvent) {
        match event {
            RunEvent::Timer { event } => match event {
                SchedulerEvent::Tick(snapshot) => {
                    if let Some(line) = format_progress(snapshot) {
                        let mut out = std::io::stdout();
                        let _ = write!(out, "\r{line}   ");
                        let _ = out.flush();
                    }
                }
                SchedulerEvent::WorkStarted {
                    cycle_index,
                    total_cycles,
                } => {
                    if *cycle_index > 1 {
                        println!(
                            "\n{}",
                            format!("▶ Cycle {cycle_index}/{total_cycles}: back to work").cyan()
                        );
                    }
                }
                SchedulerEvent::WorkPhaseComplete { cycle_index, .. } => {
                    println!(
                        "\n{}",
                        format!("✓ Work interval {cycle_index} complete!").green()
                    );
                }
                SchedulerEvent::BreakStarted { .. } => {
                    println!("\n{}", "☕ Break time! Relax...".yellow());
                }
                SchedulerEvent::RunComplete { .. } => {
                    println!("\n{}", "✓ All cycles complete! Great work!".green());
                }
            },
            RunEvent::StorageFault { message } => {
                eprintln!("\n{} {message}", "⚠ could not update session log:".red());
            }
            RunEvent::Stopped { .. } => {
                println!("\n{}", "⏹ Session stopped".yellow());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_handles_one() {
        assert_eq!(plural(1, "session"), "1 session");
        assert_eq!(plural(0, "session"), "0 sessions");
        assert_eq!(plural(3, "minute"), "3 minutes");
    }

    fn snapshot(kind: PhaseKind, remaining_secs: u64, cycle_index: u32, total_cycles: u32) -> PhaseSnapshot {
        PhaseSnapshot {
            task: "Write docs".to_string(),
            phase_kind: kind,
            remaining_secs,
            cycle_index,
            total_cycles,
        }
    }

    #[test]
    fn progress_only_on_minute_boundaries() {
        assert!(format_progress(&snapshot(PhaseKind::Work, 1499, 1, 1)).is_none());
        assert!(format_progress(&snapshot(PhaseKind::Work, 61, 1, 1)).is_none());
        assert_eq!(
            format_progress(&snapshot(PhaseKind::Work, 1440, 1, 1)).as_deref(),
            Some("⏱  Work: 24:00 remaining")
        );
        assert_eq!(
            format_progress(&snapshot(PhaseKind::Work, 0, 1, 1)).as_deref(),
            Some("⏱  Work: 0:00 remaining")
        );
    }

    #[test]
    fn progress_shows_cycle_only_for_multi_cycle_runs() {
        let line = format_progress(&snapshot(PhaseKind::Work, 120, 2, 4)).unwrap();
        assert_eq!(line, "⏱  Work (Cycle 2/4): 2:00 remaining");

        let single = format_progress(&snapshot(PhaseKind::Work, 120, 1, 1)).unwrap();
        assert!(!single.contains("Cycle"));
    }

    #[test]
    fn progress_labels_breaks() {
        let line = format_progress(&snapshot(PhaseKind::Break, 300, 1, 2)).unwrap();
        assert_eq!(line, "⏱  Break (Cycle 1/2): 5:00 remaining");
    }

    #[test]
    fn json_lines_skip_mid_minute_ticks() {
        let tick = |remaining| RunEvent::Timer {
            event: SchedulerEvent::Tick(snapshot(PhaseKind::Work, remaining, 1, 1)),
        };
        assert!(json_line(&tick(59)).is_none());

        let line = json_line(&tick(60)).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["kind"], "timer");
        assert_eq!(value["event"]["remaining_secs"], 60);

        let done = json_line(&RunEvent::Timer {
            event: SchedulerEvent::BreakStarted { cycle_index: 1 },
        })
        .unwrap();
        assert!(done.contains("break_started"));
    }

    #[test]
    fn local_time_has_minute_precision() {
        let formatted = local_time(Utc::now());
        assert_eq!(formatted.len(), "2026-01-01 09:30".len());
    }
}
