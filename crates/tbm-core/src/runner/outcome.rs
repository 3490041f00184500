//! Aggregated result of one bulk run.

use std::fmt;

use crate::retry::MutationError;

/// One successfully mutated item with the response it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSuccess<I, R> {
    pub item: I,
    pub response: R,
}

/// One abandoned item with the error that ended it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure<I> {
    pub item: I,
    pub error: MutationError,
}

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Rate-limit errors observed (each retried in place).
    pub rate_limit_hits: u32,
    /// Transient retries performed across all items.
    pub transient_retries: u32,
    /// Times the failure streak paused the whole run.
    pub breaker_pauses: u32,
}

/// How a run ended, for callers deciding whether to alert the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDisposition {
    /// Every item succeeded.
    Complete,
    /// All items were attempted; some failed.
    CompletedWithFailures,
    /// Ended at the first unrecoverable failure; later items untouched.
    Stopped,
}

impl fmt::Display for RunDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunDisposition::Complete => write!(f, "complete"),
            RunDisposition::CompletedWithFailures => write!(f, "completed with failures"),
            RunDisposition::Stopped => write!(f, "stopped early"),
        }
    }
}

/// Outcome of a bulk run.
///
/// `successful` and `failed` hold items in input order; items after a stop
/// appear in neither list.
#[derive(Debug)]
pub struct BulkOutcome<I, R> {
    pub successful: Vec<ItemSuccess<I, R>>,
    pub failed: Vec<ItemFailure<I>>,
    /// True when the run ended early under stop-on-failure.
    pub stopped: bool,
    pub stats: RunStats,
}

impl<I, R> BulkOutcome<I, R> {
    pub(crate) fn with_capacity(total: usize) -> Self {
        Self {
            successful: Vec::with_capacity(total),
            failed: Vec::new(),
            stopped: false,
            stats: RunStats::default(),
        }
    }

    /// Items resolved so far: successes plus recorded failures.
    pub fn completed(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn disposition(&self) -> RunDisposition {
        if self.stopped {
            RunDisposition::Stopped
        } else if self.failed.is_empty() {
            RunDisposition::Complete
        } else {
            RunDisposition::CompletedWithFailures
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_mapping() {
        let mut out = BulkOutcome::<u32, ()>::with_capacity(2);
        assert_eq!(out.disposition(), RunDisposition::Complete);

        out.failed.push(ItemFailure {
            item: 1,
            error: MutationError::Network("boom".into()),
        });
        assert_eq!(out.disposition(), RunDisposition::CompletedWithFailures);

        out.stopped = true;
        assert_eq!(out.disposition(), RunDisposition::Stopped);
        assert_eq!(out.completed(), 1);
    }

    #[test]
    fn disposition_display() {
        assert_eq!(RunDisposition::Stopped.to_string(), "stopped early");
        assert_eq!(
            RunDisposition::CompletedWithFailures.to_string(),
            "completed with failures"
        );
    }
}
