//! Per-node requeue backoff.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Default first retry delay.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Default retry delay cap.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(5 * 60);

/// Exponential backoff keyed by node name.
///
/// The engine itself never retries; this tracks consecutive failures so the
/// controller can pick a requeue delay.
#[derive(Debug, Clone)]
pub struct NodeBackoff {
    /// Delay after the first failure.
    base: Duration,

    /// Upper bound on any delay.
    max: Duration,

    /// Tracked failures: node -> (count, last_failure_time).
    failures: BTreeMap<String, (u32, Instant)>,
}

impl NodeBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: BTreeMap::new(),
        }
    }

    /// Record a failure and return the delay before the next attempt.
    pub fn record_failure(&mut self, node: &str) -> Duration {
        let now = Instant::now();
        let (count, last) = self
            .failures
            .entry(node.to_string())
            .or_insert((0, now));

        // Start over once the node has been quiet for a full cap interval
        if now.duration_since(*last) > self.max {
            *count = 0;
        }

        *count = count.saturating_add(1);
        *last = now;
        let count = *count;
        self.delay_for(count)
    }

    /// Consecutive failures recorded for a node.
    pub fn failures(&self, node: &str) -> u32 {
        self.failures.get(node).map_or(0, |(count, _)| *count)
    }

    /// Longest delay this tracker hands out.
    pub fn max_delay(&self) -> Duration {
        self.max
    }

    /// Clear failure tracking for a node (on success).
    pub fn clear(&mut self, node: &str) {
        self.failures.remove(node);
    }

    /// Drop entries that have been quiet longer than the cap.
    pub fn prune(&mut self) {
        let now = Instant::now();
        let max = self.max;
        self.failures
            .retain(|_, (_, last)| now.duration_since(*last) <= max);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    fn delay_for(&self, count: u32) -> Duration {
        let shift = count.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << shift)
            .map_or(self.max, |d| d.min(self.max))
    }
}

impl Default for NodeBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX)
    }
}
