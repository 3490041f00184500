//! Adaptive pacing.
//!
//! One [`DelayState`] lives for the duration of a single bulk run: successes
//! shrink the per-item delay toward a learned floor, rate-limit hits grow it
//! and raise the believed-safe threshold. The [`DelayController`] wraps the
//! state and broadcasts every change to optional observer channels.

mod controller;
mod state;

#[cfg(test)]
mod tests;

pub use controller::DelayController;
pub use state::{DelayState, DelayTuning, Thresholds, Zone};
