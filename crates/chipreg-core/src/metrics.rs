//! Process-wide job counters.
//!
//! The scheduler bumps a [`Counter`] at each step. The pipeline takes a
//! [`CounterSnapshot`] before and after a run and logs the difference, so
//! several runs in one process each report their own numbers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Global counters.
pub static METRICS: JobCounters = JobCounters::new();

/// What was counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// A job was handed to a worker slot.
    JobsLaunched,
    /// The analysis tool was invoked once.
    Invocations,
    /// A transient failure was retried.
    Retries,
    /// A job was satisfied from a previous run.
    Resumed,
}

impl Counter {
    const COUNT: usize = 4;

    fn slot(self) -> usize {
        match self {
            Counter::JobsLaunched => 0,
            Counter::Invocations => 1,
            Counter::Retries => 2,
            Counter::Resumed => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Counter::JobsLaunched => "jobs_launched",
            Counter::Invocations => "invocations",
            Counter::Retries => "retries",
            Counter::Resumed => "resumed",
        }
    }
}

/// Counter values at one instant, or the difference between two instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub jobs_launched: u64,
    pub invocations: u64,
    pub retries: u64,
    pub resumed: u64,
}

impl CounterSnapshot {
    /// Counts accumulated since `earlier`.
    pub fn since(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            jobs_launched: self.jobs_launched.saturating_sub(earlier.jobs_launched),
            invocations: self.invocations.saturating_sub(earlier.invocations),
            retries: self.retries.saturating_sub(earlier.retries),
            resumed: self.resumed.saturating_sub(earlier.resumed),
        }
    }
}

pub struct JobCounters {
    slots: [AtomicU64; Counter::COUNT],
}

impl Default for JobCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl JobCounters {
    pub const fn new() -> Self {
        Self {
            slots: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    pub fn inc(&self, counter: Counter) {
        self.slots[counter.slot()].fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = counter.name(), "counter incremented");
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.slots[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            jobs_launched: self.get(Counter::JobsLaunched),
            invocations: self.get(Counter::Invocations),
            retries: self.get(Counter::Retries),
            resumed: self.get(Counter::Resumed),
        }
    }

    /// Log the counts accumulated since `start` as one event and return them.
    pub fn flush(&self, run_id: &str, start: &CounterSnapshot) -> CounterSnapshot {
        let delta = self.snapshot().since(start);
        tracing::info!(
            event = "metrics.flush",
            run_id = %run_id,
            jobs_launched = delta.jobs_launched,
            invocations = delta.invocations,
            retries = delta.retries,
            resumed = delta.resumed,
        );
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let c = JobCounters::new();
        c.inc(Counter::Invocations);
        c.inc(Counter::Invocations);
        c.inc(Counter::Retries);
        assert_eq!(c.get(Counter::Invocations), 2);
        assert_eq!(c.get(Counter::Retries), 1);
        assert_eq!(c.get(Counter::JobsLaunched), 0);
        assert_eq!(c.get(Counter::Resumed), 0);
    }

    #[test]
    fn test_flush_reports_only_this_run() {
        let c = JobCounters::new();
        c.inc(Counter::JobsLaunched);
        c.inc(Counter::Invocations);

        let start = c.snapshot();
        c.inc(Counter::Invocations);
        c.inc(Counter::Resumed);

        let delta = c.flush("run-1", &start);
        assert_eq!(
            delta,
            CounterSnapshot {
                jobs_launched: 0,
                invocations: 1,
                retries: 0,
                resumed: 1,
            }
        );
    }

    #[test]
    fn test_since_never_underflows() {
        let later = CounterSnapshot::default();
        let earlier = CounterSnapshot {
            retries: 3,
            ..CounterSnapshot::default()
        };
        assert_eq!(later.since(&earlier).retries, 0);
    }
}
