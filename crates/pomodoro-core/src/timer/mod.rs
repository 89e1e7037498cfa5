mod scheduler;
mod ticks;

pub use scheduler::{
    IntervalScheduler, PhaseKind, PhaseSnapshot, RunPlan, SchedulerState, TimerPhase,
};
pub use ticks::{IntervalTicks, ManualTicks, TickSource, TickTrigger};

/// Format seconds as `M:SS`.
pub fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
