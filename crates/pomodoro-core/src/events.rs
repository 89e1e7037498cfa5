use serde::{Deserialize, Serialize};

use crate::timer::PhaseSnapshot;

/// Phase transitions emitted by the interval scheduler, in the order they
/// happen. A presentation layer renders these; the coordinator turns some of
/// them into store mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// A work phase began. For cycles after the first the coordinator links
    /// a fresh record before the next tick.
    WorkStarted {
        cycle_index: u32,
        total_cycles: u32,
    },
    /// One second elapsed in the active phase.
    Tick(PhaseSnapshot),
    WorkPhaseComplete {
        cycle_index: u32,
        record_id: Option<i64>,
    },
    BreakStarted {
        cycle_index: u32,
    },
    /// Every cycle finished; the scheduler is now stopped.
    RunComplete {
        cycles_completed: u32,
    },
}

/// What the coordination loop publishes on its event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEvent {
    Timer { event: SchedulerEvent },
    /// A store mutation failed. Timing continues; the durable log lags
    /// behind until the fault is resolved.
    StorageFault { message: String },
    /// The run was stopped before completing.
    Stopped { phase: Option<PhaseSnapshot> },
}

impl From<SchedulerEvent> for RunEvent {
    fn from(event: SchedulerEvent) -> Self {
        RunEvent::Timer { event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::PhaseKind;

    #[test]
    fn tick_serializes_with_snapshot_fields() {
        let event = SchedulerEvent::Tick(PhaseSnapshot {
            task: "write report".into(),
            phase_kind: PhaseKind::Work,
            remaining_secs: 1499,
            cycle_index: 1,
            total_cycles: 2,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["phase_kind"], "work");
        assert_eq!(json["remaining_secs"], 1499);
    }

    #[test]
    fn run_event_wraps_scheduler_event() {
        let event: RunEvent = SchedulerEvent::BreakStarted { cycle_index: 3 }.into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "timer");
        assert_eq!(json["event"]["type"], "break_started");
        assert_eq!(json["event"]["cycle_index"], 3);
    }
}
