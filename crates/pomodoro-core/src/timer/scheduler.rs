//! Interval scheduler: the work/break state machine.
//!
//! The scheduler is pure. It never touches storage or clocks; the caller
//! calls `tick()` once per elapsed second and acts on the returned events.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Working(1) -> [OnBreak(1)] -> Working(2) -> ... -> Stopped
//!              \______________ stop() from any state ______/
//! ```
//!
//! A configured break always follows a work phase, including the last one:
//! with `break_secs > 0` the run only completes once the trailing break has
//! elapsed.
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = IntervalScheduler::new(plan)?;
//! scheduler.start(Some(record_id))?;
//! // once per second:
//! for event in scheduler.tick() { /* render, persist */ }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::SchedulerEvent;

/// Fixed configuration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    pub task: String,
    pub work_secs: u64,
    pub break_secs: u64,
    pub total_cycles: u32,
}

impl RunPlan {
    pub fn new(task: impl Into<String>, work_secs: u64, break_secs: u64, total_cycles: u32) -> Self {
        Self {
            task: task.into(),
            work_secs,
            break_secs,
            total_cycles,
        }
    }

    /// Build a plan from minute durations, as entered on the command line.
    pub fn from_minutes(
        task: impl Into<String>,
        work_min: u64,
        break_min: u64,
        total_cycles: u32,
    ) -> Self {
        Self::new(
            task,
            work_min.saturating_mul(60),
            break_min.saturating_mul(60),
            total_cycles,
        )
    }

    /// Reject plans that cannot run. Nothing is created before this passes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task.trim().is_empty() {
            return Err(ValidationError::invalid("task", "must not be empty"));
        }
        if self.work_secs == 0 {
            return Err(ValidationError::invalid(
                "work",
                "work duration must be greater than zero",
            ));
        }
        if self.total_cycles == 0 {
            return Err(ValidationError::invalid("cycles", "must be at least 1"));
        }
        Ok(())
    }

    /// Ticks from start to run completion, trailing break included.
    pub fn total_ticks(&self) -> u64 {
        self.work_secs
            .saturating_add(self.break_secs)
            .saturating_mul(u64::from(self.total_cycles))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Work,
    Break,
}

/// The active interval. Lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPhase {
    pub kind: PhaseKind,
    pub planned_secs: u64,
    pub remaining_secs: u64,
    /// 1-based.
    pub cycle_index: u32,
    pub total_cycles: u32,
    /// Record backing this interval. Breaks never have one.
    pub linked_record_id: Option<i64>,
}

impl TimerPhase {
    fn work(plan: &RunPlan, cycle_index: u32, record_id: Option<i64>) -> Self {
        Self {
            kind: PhaseKind::Work,
            planned_secs: plan.work_secs,
            remaining_secs: plan.work_secs,
            cycle_index,
            total_cycles: plan.total_cycles,
            linked_record_id: record_id,
        }
    }

    fn rest(plan: &RunPlan, cycle_index: u32) -> Self {
        Self {
            kind: PhaseKind::Break,
            planned_secs: plan.break_secs,
            remaining_secs: plan.break_secs,
            cycle_index,
            total_cycles: plan.total_cycles,
            linked_record_id: None,
        }
    }

    pub fn snapshot(&self, task: &str) -> PhaseSnapshot {
        PhaseSnapshot {
            task: task.to_string(),
            phase_kind: self.kind,
            remaining_secs: self.remaining_secs,
            cycle_index: self.cycle_index,
            total_cycles: self.total_cycles,
        }
    }
}

/// Plain data handed to presentation on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub task: String,
    pub phase_kind: PhaseKind,
    pub remaining_secs: u64,
    pub cycle_index: u32,
    pub total_cycles: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Working(TimerPhase),
    OnBreak(TimerPhase),
    Stopped,
}

/// Drives a sequence of work/break phases across `total_cycles`.
#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    plan: RunPlan,
    state: SchedulerState,
    cycles_completed: u32,
    last_snapshot: Option<PhaseSnapshot>,
}

impl IntervalScheduler {
    /// Create an idle scheduler for a validated plan.
    pub fn new(plan: RunPlan) -> Result<Self, ValidationError> {
        plan.validate()?;
        Ok(Self {
            plan,
            state: SchedulerState::Idle,
            cycles_completed: 0,
            last_snapshot: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == SchedulerState::Stopped
    }

    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    pub fn current_phase(&self) -> Option<&TimerPhase> {
        match &self.state {
            SchedulerState::Working(phase) | SchedulerState::OnBreak(phase) => Some(phase),
            SchedulerState::Idle | SchedulerState::Stopped => None,
        }
    }

    /// Snapshot of the active phase, or the last one observed before the
    /// scheduler stopped.
    pub fn snapshot(&self) -> Option<PhaseSnapshot> {
        self.current_phase()
            .map(|phase| phase.snapshot(&self.plan.task))
            .or_else(|| self.last_snapshot.clone())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// `Idle -> Working(1)`. `record_id` is the record opened for cycle 1.
    pub fn start(&mut self, record_id: Option<i64>) -> Result<Vec<SchedulerEvent>, ValidationError> {
        if self.state != SchedulerState::Idle {
            return Err(ValidationError::InvalidState(
                "scheduler has already been started".into(),
            ));
        }
        let mut events = Vec::with_capacity(1);
        self.begin_work(1, record_id, &mut events);
        Ok(events)
    }

    /// Attach the record opened for the current work phase.
    pub fn link_record(&mut self, record_id: i64) -> Result<(), ValidationError> {
        match &mut self.state {
            SchedulerState::Working(phase) => {
                phase.linked_record_id = Some(record_id);
                Ok(())
            }
            _ => Err(ValidationError::InvalidState(
                "records can only be linked to a work phase".into(),
            )),
        }
    }

    /// Advance one second. Returns nothing when idle or stopped.
    pub fn tick(&mut self) -> Vec<SchedulerEvent> {
        let phase = match &mut self.state {
            SchedulerState::Working(phase) | SchedulerState::OnBreak(phase) => phase,
            SchedulerState::Idle | SchedulerState::Stopped => return Vec::new(),
        };

        phase.remaining_secs = phase.remaining_secs.saturating_sub(1);
        let snapshot = phase.snapshot(&self.plan.task);
        let finished = (phase.remaining_secs == 0).then(|| phase.clone());

        let mut events = vec![SchedulerEvent::Tick(snapshot.clone())];
        self.last_snapshot = Some(snapshot);

        if let Some(finished) = finished {
            self.on_phase_elapsed(finished, &mut events);
        }
        events
    }

    /// Stop ticking. Returns the phase that was in progress, or `None` when
    /// nothing was running. Stopping twice is a no-op.
    pub fn stop(&mut self) -> Option<TimerPhase> {
        let previous = std::mem::replace(&mut self.state, SchedulerState::Stopped);
        match previous {
            SchedulerState::Working(phase) | SchedulerState::OnBreak(phase) => {
                self.last_snapshot = Some(phase.snapshot(&self.plan.task));
                Some(phase)
            }
            SchedulerState::Idle | SchedulerState::Stopped => None,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn on_phase_elapsed(&mut self, finished: TimerPhase, events: &mut Vec<SchedulerEvent>) {
        let cycle = finished.cycle_index;
        let more_cycles = cycle < self.plan.total_cycles;

        match finished.kind {
            PhaseKind::Work => {
                self.cycles_completed += 1;
                events.push(SchedulerEvent::WorkPhaseComplete {
                    cycle_index: cycle,
                    record_id: finished.linked_record_id,
                });
                if self.plan.break_secs > 0 {
                    self.state = SchedulerState::OnBreak(TimerPhase::rest(&self.plan, cycle));
                    events.push(SchedulerEvent::BreakStarted { cycle_index: cycle });
                } else if more_cycles {
                    self.begin_work(cycle + 1, None, events);
                } else {
                    self.finish(events);
                }
            }
            PhaseKind::Break => {
                if more_cycles {
                    self.begin_work(cycle + 1, None, events);
                } else {
                    self.finish(events);
                }
            }
        }
    }

    fn begin_work(&mut self, cycle_index: u32, record_id: Option<i64>, events: &mut Vec<SchedulerEvent>) {
        self.state = SchedulerState::Working(TimerPhase::work(&self.plan, cycle_index, record_id));
        events.push(SchedulerEvent::WorkStarted {
            cycle_index,
            total_cycles: self.plan.total_cycles,
        });
    }

    fn finish(&mut self, events: &mut Vec<SchedulerEvent>) {
        self.state = SchedulerState::Stopped;
        events.push(SchedulerEvent::RunComplete {
            cycles_completed: self.cycles_completed,
        });
    }
}
