//! Session coordinator.
//!
//! Bridges scheduler events to the session store: one durable record per
//! work phase, and never more than one open record at a time. The
//! single-open rule is a check-then-create done here, which is only safe
//! while a single process works against a given store.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, Result, ValidationError};
use crate::events::{RunEvent, SchedulerEvent};
use crate::storage::{SessionRecord, SessionStats, SessionStore, StatsPeriod};
use crate::timer::{IntervalScheduler, PhaseKind, PhaseSnapshot, RunPlan, TickSource, TimerPhase};

/// Outcome of a single tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub events: Vec<SchedulerEvent>,
    /// Store mutations that failed during this tick. The scheduler has
    /// already moved on regardless.
    pub failures: Vec<CoreError>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub task: String,
    pub cycles_completed: u32,
    pub total_cycles: u32,
    pub stopped_early: bool,
    pub ticks: u64,
    pub storage_failures: u32,
    pub last_phase: Option<PhaseSnapshot>,
}

pub struct SessionCoordinator<S> {
    store: S,
    scheduler: Option<IntervalScheduler>,
    /// Events produced by `begin_run`, published when the loop starts.
    pending: Vec<SchedulerEvent>,
}

impl<S: SessionStore> SessionCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            scheduler: None,
            pending: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> Option<&IntervalScheduler> {
        self.scheduler.as_ref()
    }

    fn is_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| !s.is_stopped())
    }

    /// Open the cycle-1 record and start the scheduler.
    ///
    /// Returns the id of the record opened for the first work phase.
    ///
    /// # Errors
    /// - `Validation` for an unusable plan, before any I/O.
    /// - `SessionAlreadyActive` if the store already has an open record.
    /// - `Database` if the store cannot be read or written.
    pub fn begin_run(&mut self, plan: RunPlan) -> Result<i64> {
        plan.validate()?;
        if self.is_running() {
            return Err(ValidationError::InvalidState("a run is already in progress".into()).into());
        }
        if let Some(open) = self.store.current_open()? {
            return Err(CoreError::SessionAlreadyActive(Box::new(open)));
        }

        let record_id = self.store.create(&plan.task, plan.work_secs)?;
        let mut scheduler = IntervalScheduler::new(plan)?;
        self.pending = scheduler.start(Some(record_id))?;

        let plan = scheduler.plan();
        info!(
            record_id,
            task = %plan.task,
            work_secs = plan.work_secs,
            break_secs = plan.break_secs,
            cycles = plan.total_cycles,
            "run started"
        );
        self.scheduler = Some(scheduler);
        Ok(record_id)
    }

    /// Process one tick and apply its store effects.
    ///
    /// A new work phase gets its record linked before this returns, so the
    /// next tick already counts down against it.
    pub fn advance(&mut self) -> TickReport {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return TickReport::default();
        };

        let events = scheduler.tick();
        let mut failures = Vec::new();

        for event in &events {
            match event {
                SchedulerEvent::Tick(snapshot) => {
                    debug!(
                        phase = ?snapshot.phase_kind,
                        remaining = snapshot.remaining_secs,
                        cycle = snapshot.cycle_index,
                        "tick"
                    );
                }
                SchedulerEvent::WorkPhaseComplete {
                    cycle_index,
                    record_id: Some(id),
                } => {
                    info!(cycle = cycle_index, record_id = id, "work phase complete");
                    if let Err(e) = self.store.complete(*id) {
                        error!(record_id = id, error = %e, "failed to complete session record");
                        failures.push(e);
                    }
                }
                SchedulerEvent::WorkPhaseComplete {
                    cycle_index,
                    record_id: None,
                } => {
                    warn!(cycle = cycle_index, "work phase finished without a backing record");
                }
                SchedulerEvent::WorkStarted { cycle_index, .. } if *cycle_index > 1 => {
                    let plan = scheduler.plan();
                    match self.store.create(&plan.task, plan.work_secs) {
                        Ok(id) => {
                            if let Err(e) = scheduler.link_record(id) {
                                failures.push(e.into());
                            } else {
                                info!(cycle = cycle_index, record_id = id, "work phase started");
                            }
                        }
                        Err(e) => {
                            error!(cycle = cycle_index, error = %e, "failed to open session record");
                            failures.push(e);
                        }
                    }
                }
                SchedulerEvent::BreakStarted { cycle_index } => {
                    info!(cycle = cycle_index, "break started");
                }
                SchedulerEvent::RunComplete { cycles_completed } => {
                    info!(cycles = cycles_completed, "run complete");
                }
                SchedulerEvent::WorkStarted { .. } => {}
            }
        }

        TickReport { events, failures }
    }

    /// Stop the run. Closes the open work record, if any, exactly once.
    ///
    /// Returns the phase that was in progress; `None` when nothing was
    /// running, which makes repeated calls harmless.
    pub fn stop(&mut self) -> Result<Option<TimerPhase>> {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return Ok(None);
        };
        let phase = scheduler.stop();
        self.pending.clear();

        if let Some(phase) = &phase {
            info!(
                cycle = phase.cycle_index,
                remaining = phase.remaining_secs,
                "run stopped"
            );
            if let (PhaseKind::Work, Some(id)) = (phase.kind, phase.linked_record_id) {
                self.store.complete(id)?;
            }
        }
        Ok(phase)
    }

    /// Drive the current run until it completes or `stop` flips to `true`.
    ///
    /// Ticks and the stop signal are awaited from this one loop, so ticks are
    /// never processed concurrently and none is processed after a stop is
    /// observed. Every event and storage fault is published on `events`; a
    /// dropped receiver only silences publishing.
    pub async fn run<T: TickSource>(
        &mut self,
        ticks: &mut T,
        mut stop: watch::Receiver<bool>,
        events: mpsc::UnboundedSender<RunEvent>,
    ) -> Result<RunSummary> {
        let Some(scheduler) = self.scheduler.as_ref() else {
            return Err(ValidationError::InvalidState("no run has been started".into()).into());
        };
        let plan = scheduler.plan().clone();
        let mut summary = RunSummary {
            task: plan.task.clone(),
            cycles_completed: scheduler.cycles_completed(),
            total_cycles: plan.total_cycles,
            stopped_early: false,
            ticks: 0,
            storage_failures: 0,
            last_phase: None,
        };

        for event in self.pending.drain(..) {
            let _ = events.send(event.into());
        }

        let mut stop_listening = true;
        let mut stop_requested = *stop.borrow_and_update();

        while !stop_requested && self.is_running() {
            tokio::select! {
                biased;
                changed = stop.changed(), if stop_listening => match changed {
                    Ok(()) => stop_requested = *stop.borrow_and_update(),
                    // Sender gone: nobody can ask for a stop any more.
                    Err(_) => stop_listening = false,
                },
                _ = ticks.tick() => {
                    let report = self.advance();
                    summary.ticks += 1;
                    for event in report.events {
                        let _ = events.send(event.into());
                    }
                    for failure in report.failures {
                        summary.storage_failures += 1;
                        let _ = events.send(RunEvent::StorageFault {
                            message: failure.to_string(),
                        });
                    }
                }
            }
        }

        if stop_requested && self.is_running() {
            let phase = self.stop()?;
            summary.stopped_early = true;
            let _ = events.send(RunEvent::Stopped {
                phase: phase.map(|p| p.snapshot(&plan.task)),
            });
        }

        if let Some(scheduler) = &self.scheduler {
            summary.cycles_completed = scheduler.cycles_completed();
            summary.last_phase = scheduler.snapshot();
        }
        Ok(summary)
    }

    /// The open record, if any. Survives process restarts, unlike the
    /// in-memory scheduler.
    pub fn current_status(&self) -> Result<Option<SessionRecord>> {
        self.store.current_open()
    }

    /// Close the open record on behalf of a process that is not running the
    /// timer itself.
    ///
    /// # Errors
    /// `NoActiveSession` when nothing is open.
    pub fn close_open_session(&mut self) -> Result<SessionRecord> {
        let open = self.store.current_open()?.ok_or(CoreError::NoActiveSession)?;
        self.store.complete(open.id)?;
        info!(record_id = open.id, task = %open.task, "open session closed");
        Ok(open)
    }

    pub fn history(&self, days: u32, limit: usize) -> Result<Vec<SessionRecord>> {
        self.store.history(days, limit)
    }

    pub fn stats(&self, period: StatsPeriod) -> Result<SessionStats> {
        self.store.aggregate(period.lookback_days())
    }
}
