//! Progress and telemetry channels for a bulk run.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::pacing::Thresholds;

/// One progress tick, emitted after each item resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkProgress {
    /// Items resolved so far (successes plus recorded failures).
    pub completed: usize,
    pub total: usize,
    /// Delay bounds at the time of the tick.
    pub thresholds: Thresholds,
}

impl BulkProgress {
    /// Fraction complete in `[0.0, 1.0]`. An empty run counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Observer channels for one run.
///
/// All slots are optional. A missing observer, a full channel, or a dropped
/// receiver never stalls or fails the run; notifications are simply dropped.
#[derive(Debug, Default, Clone)]
pub struct RunHooks {
    /// Ticks once per resolved item.
    pub progress: Option<mpsc::Sender<BulkProgress>>,
    /// Current per-item delay after every change; zero signals idle at run end.
    pub delay: Option<mpsc::Sender<Duration>>,
    /// Delay bounds after every change; `None` signals idle at run end.
    pub thresholds: Option<mpsc::Sender<Option<Thresholds>>>,
}

impl RunHooks {
    /// Hooks with no observers attached.
    pub fn none() -> Self {
        Self::default()
    }

    pub(crate) fn send_progress(&self, tick: BulkProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.try_send(tick);
        }
    }

    pub(crate) fn send_delay(&self, delay: Duration) {
        if let Some(tx) = &self.delay {
            let _ = tx.try_send(delay);
        }
    }

    pub(crate) fn send_thresholds(&self, thresholds: Option<Thresholds>) {
        if let Some(tx) = &self.thresholds {
            let _ = tx.try_send(thresholds);
        }
    }
}
