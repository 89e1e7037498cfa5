//! Tick sources for the coordination loop.
//!
//! The scheduler counts ticks, not wall time, so whatever drives it decides
//! how long a second is. Production uses [`IntervalTicks`]; tests step the
//! loop with [`ManualTicks`] or a source that never waits.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Something that resolves once per scheduler tick.
pub trait TickSource {
    fn tick(&mut self) -> impl Future<Output = ()>;
}

/// Real-time ticks backed by `tokio::time::interval`.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        // First tick lands one full period after start, not immediately.
        let mut interval = time::interval_at(Instant::now() + period, period);
        // Burst catches up after a suspend so the countdown tracks wall time.
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TickSource for IntervalTicks {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Ticks delivered by hand through a [`TickTrigger`].
///
/// Once every trigger is dropped the source never resolves again.
pub struct ManualTicks {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Sending half of [`ManualTicks`].
#[derive(Clone)]
pub struct TickTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicks {
    pub fn channel() -> (Self, TickTrigger) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickTrigger { tx })
    }
}

impl TickTrigger {
    /// Queue `n` ticks. Returns false if the source is gone.
    pub fn fire(&self, n: usize) -> bool {
        (0..n).all(|_| self.tx.send(()).is_ok())
    }
}

impl TickSource for ManualTicks {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
