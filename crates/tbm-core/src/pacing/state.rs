//! Adaptive delay state and zone math.

use std::time::Duration;

/// Initial delay bounds for a bulk run, all in milliseconds.
///
/// These seed a fresh [`DelayState`] at the start of every run; nothing
/// learned by one run carries over to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayTuning {
    /// Lowest per-item delay the engine will ever use.
    pub floor_ms: u64,
    /// Per-item delay at the start of the run.
    pub start_ms: u64,
    /// Initial peak; raised later whenever the current delay exceeds it.
    pub peak_ms: u64,
}

impl Default for DelayTuning {
    fn default() -> Self {
        Self {
            floor_ms: 200,
            start_ms: 1000,
            peak_ms: 3000,
        }
    }
}

/// How far the current delay sits above the learned sustainable rate.
/// Derived from [`DelayState`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// `current >= average`: clearly over-throttled.
    Red,
    /// `sustainable <= current < average`: above the believed-safe rate.
    Yellow,
    /// `current < sustainable`: probing below the believed-safe rate.
    Green,
}

/// Snapshot of the delay bounds, emitted to observers on every change.
/// Purely informational; consumers exert no back-pressure on the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub floor_ms: u64,
    pub average_ms: u64,
    pub sustainable_ms: u64,
    pub peak_ms: u64,
}

/// Adaptive per-item delay state for one bulk run.
///
/// Invariants held after every transition: `floor <= average <= peak`, and
/// `current` never drops below `floor`. `peak` is a high-water mark, not a
/// ceiling; `current` may exceed it after rate-limit growth until the next
/// success raises `peak` to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayState {
    pub current_ms: u64,
    pub floor_ms: u64,
    pub peak_ms: u64,
    pub average_ms: u64,
    pub sustainable_ms: u64,
}

impl DelayState {
    /// Create a fresh state from the given tuning.
    ///
    /// Bounds are normalized: floor is at least 1 ms, peak at least floor,
    /// and the starting delay at least floor. The sustainable estimate
    /// starts at the floor.
    pub fn new(tuning: DelayTuning) -> Self {
        let floor = tuning.floor_ms.max(1);
        let peak = tuning.peak_ms.max(floor);
        let mut state = Self {
            current_ms: tuning.start_ms.max(floor),
            floor_ms: floor,
            peak_ms: peak,
            average_ms: 0,
            sustainable_ms: floor,
        };
        state.recompute_average();
        state
    }

    /// Current per-item delay as a [`Duration`].
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Classify the current delay against the learned bounds.
    pub fn zone(&self) -> Zone {
        if self.current_ms >= self.average_ms {
            Zone::Red
        } else if self.current_ms >= self.sustainable_ms {
            Zone::Yellow
        } else {
            Zone::Green
        }
    }

    /// Snapshot of the current bounds for observers.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            floor_ms: self.floor_ms,
            average_ms: self.average_ms,
            sustainable_ms: self.sustainable_ms,
            peak_ms: self.peak_ms,
        }
    }

    /// Speed up after a successful call.
    ///
    /// Raises the peak if the current delay exceeded it, then cuts the
    /// current delay by an amount keyed to the zone: 20% in red, 1000 ms in
    /// yellow, 1 ms in green, nothing at or below the floor. The result is
    /// clamped to the floor and the average recomputed.
    pub fn record_success(&mut self) {
        if self.current_ms > self.peak_ms {
            self.peak_ms = self.current_ms;
        }
        if self.current_ms > self.floor_ms {
            self.current_ms = match self.zone() {
                Zone::Red => (self.current_ms as f64 * 0.8).round() as u64,
                Zone::Yellow => self.current_ms.saturating_sub(1000),
                Zone::Green => self.current_ms - 1,
            };
        }
        self.current_ms = self.current_ms.max(self.floor_ms);
        self.recompute_average();
    }

    /// Back off after a rate-limit error.
    ///
    /// Each hit nudges the floor up by 1 ms (never past the average), raises
    /// the sustainable estimate by 10 ms, and grows the current delay by 50%.
    pub fn record_rate_limit(&mut self) {
        self.floor_ms = (self.floor_ms + 1).min(self.average_ms);
        self.recompute_average();
        self.sustainable_ms = self.sustainable_ms.saturating_add(10);
        self.current_ms = (self.current_ms as f64 * 1.5).ceil() as u64;
    }

    /// `average = round((peak + floor) / 2)`, rounding half up.
    fn recompute_average(&mut self) {
        self.average_ms = ((self.peak_ms + self.floor_ms) as f64 / 2.0).round() as u64;
    }
}
