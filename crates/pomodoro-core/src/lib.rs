//! # Pomodoro Core Library
//!
//! Core logic for tracking focused work intervals. The CLI binary is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Interval Scheduler**: a pure work/break state machine advanced one
//!   tick (second) at a time by the caller
//! - **Session Coordinator**: turns scheduler events into session records and
//!   keeps at most one record open
//! - **Storage**: SQLite session log and TOML configuration
//!
//! ## Key Components
//!
//! - [`IntervalScheduler`]: work/break state machine
//! - [`SessionCoordinator`]: run lifecycle and the coordination loop
//! - [`Database`]: [`SessionStore`] backed by SQLite
//! - [`Config`]: user defaults

pub mod coordinator;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use coordinator::{RunSummary, SessionCoordinator, TickReport};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{RunEvent, SchedulerEvent};
pub use storage::{Config, Database, SessionRecord, SessionStats, SessionStore, StatsPeriod};
pub use timer::{
    IntervalScheduler, IntervalTicks, PhaseKind, PhaseSnapshot, RunPlan, SchedulerState,
    TickSource, TimerPhase,
};
