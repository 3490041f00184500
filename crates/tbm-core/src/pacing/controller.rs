//! Delay controller: owns the per-run state and notifies observers.

use std::time::Duration;

use tokio::sync::mpsc;

use super::state::{DelayState, DelayTuning, Thresholds};

/// Owns the adaptive delay state for one bulk run and pushes every change to
/// the optional observer channels. A full channel or dropped receiver is
/// ignored; observation never stalls the run.
#[derive(Debug)]
pub struct DelayController {
    state: DelayState,
    delay_tx: Option<mpsc::Sender<Duration>>,
    thresholds_tx: Option<mpsc::Sender<Option<Thresholds>>>,
}

impl DelayController {
    /// Controller with no observers.
    pub fn new(tuning: DelayTuning) -> Self {
        Self::with_observers(tuning, None, None)
    }

    /// Controller that reports delay and threshold changes on the given
    /// channels.
    pub fn with_observers(
        tuning: DelayTuning,
        delay_tx: Option<mpsc::Sender<Duration>>,
        thresholds_tx: Option<mpsc::Sender<Option<Thresholds>>>,
    ) -> Self {
        Self {
            state: DelayState::new(tuning),
            delay_tx,
            thresholds_tx,
        }
    }

    /// Current per-item delay.
    pub fn current_delay(&self) -> Duration {
        self.state.current_delay()
    }

    /// Read access to the underlying state.
    pub fn state(&self) -> &DelayState {
        &self.state
    }

    /// Snapshot of the current bounds.
    pub fn thresholds(&self) -> Thresholds {
        self.state.thresholds()
    }

    /// Announce the current delay and bounds without changing state. Called
    /// once at run start so observers see the initial values.
    pub fn announce(&self) {
        self.notify();
    }

    /// Record a successful call and notify observers.
    pub fn on_success(&mut self) {
        self.state.record_success();
        self.notify();
    }

    /// Record a rate-limit hit and notify observers.
    pub fn on_rate_limit(&mut self) {
        self.state.record_rate_limit();
        self.notify();
    }

    fn notify(&self) {
        if let Some(tx) = &self.delay_tx {
            let _ = tx.try_send(self.state.current_delay());
        }
        if let Some(tx) = &self.thresholds_tx {
            let _ = tx.try_send(Some(self.state.thresholds()));
        }
    }
}
