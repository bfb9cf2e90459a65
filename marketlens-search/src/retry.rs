//! Retry budget, backoff schedule, and the per-page fetch state machine.

use std::time::Duration;

/// Retry budget and backoff shape for one page fetch.
///
/// `max_retries` counts *additional* attempts after the first, so the default
/// of 3 yields at most 4 requests per page.
///
/// ```
/// use marketlens_search::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries, 3);
/// assert_eq!(policy.backoff_delay(1, None), Duration::from_millis(500));
/// assert_eq!(policy.backoff_delay(2, None), Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles per retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay, server-suggested or computed.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before the retry that follows failed `attempt`
    /// (1-based). A server-provided `Retry-After` wins over the computed
    /// exponential schedule; both are capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(secs) = retry_after_secs {
            return Duration::from_secs(secs).min(self.max_delay);
        }
        let shift = attempt.saturating_sub(1).min(16);
        let exp = self.base_delay.saturating_mul(1u32 << shift);
        exp.min(self.max_delay)
    }
}

/// Fetch lifecycle of a single page.
///
/// `Requesting` issues one attempt. A transient failure inside the retry
/// budget moves to `Retrying`, which sleeps its delay and re-enters
/// `Requesting` with the next attempt number. Terminal outcomes (success,
/// non-transient failure, budget exhausted) exit the machine rather than
/// becoming states that carry payloads around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageState {
    Pending,
    Requesting { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
}
