// SPDX-License-Identifier: Apache-2.0

//! Per-worker wait statistics, aggregation and summary emission.
//!
//! Workers own their [`WorkerReport`] for the duration of a run and hand it
//! back to the coordinator at join. The coordinator folds the reports into
//! [`RunTotals`] and derives three [`Rollup`] views: per input unit across
//! all threads, per input number summed across threads, and per thread
//! summed across inputs.

pub mod emit;

/// Statistics produced by one worker over a full run.
#[derive(Clone, Debug, Default)]
pub struct WorkerReport {
    /// Worker id, dense in `0..thread_count`.
    pub worker_id: usize,
    /// Workload answers folded with bitwise or; keeps the opaque workload
    /// observable so the optimizer cannot discard it.
    pub answer: u32,
    /// Items processed.
    pub processed: usize,
    /// Spin/monitor-wait cycles burnt across all rounds.
    pub total_iterations: u64,
    /// Rounds this worker resolved by blocking in the kernel event.
    pub hard_wait_count: usize,
    /// Rounds this worker resolved in userspace.
    pub soft_wait_count: usize,
    /// Summed wakeup latency of hard waits, in ticks.
    pub hard_wait_wakeup_ticks: u64,
    /// Summed wakeup latency of soft waits, in ticks.
    pub soft_wait_wakeup_ticks: u64,
}

/// Sums of the wait statistics across all workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Total spin/monitor-wait cycles.
    pub iterations: u64,
    /// Total hard waits.
    pub hard_waits: u64,
    /// Total soft waits.
    pub soft_waits: u64,
    /// Total hard-wait wakeup ticks.
    pub hard_wakeup_ticks: u64,
    /// Total soft-wait wakeup ticks.
    pub soft_wakeup_ticks: u64,
}

impl RunTotals {
    /// Accumulates the totals across `reports`.
    pub fn collect<'a>(reports: impl IntoIterator<Item = &'a WorkerReport>) -> Self {
        let mut totals = Self::default();
        for report in reports {
            tracing::trace!(
                worker = report.worker_id,
                iterations = report.total_iterations,
                hard = report.hard_wait_count,
                soft = report.soft_wait_count,
                "folding worker report into the totals"
            );
            totals.iterations += report.total_iterations;
            totals.hard_waits += report.hard_wait_count as u64;
            totals.soft_waits += report.soft_wait_count as u64;
            totals.hard_wakeup_ticks += report.hard_wait_wakeup_ticks;
            totals.soft_wakeup_ticks += report.soft_wait_wakeup_ticks;
        }
        tracing::debug!(
            iterations = totals.iterations,
            hard_waits = totals.hard_waits,
            soft_waits = totals.soft_waits,
            "collected run totals"
        );
        totals
    }

    /// Average per input unit across all threads (divisor `K * N`).
    #[must_use]
    pub fn per_unit(&self, input_count: u64, thread_count: u64) -> Rollup {
        self.rollup(input_count * thread_count)
    }

    /// Average per input number, summed across threads (divisor `K`).
    #[must_use]
    pub fn per_input(&self, input_count: u64) -> Rollup {
        self.rollup(input_count)
    }

    /// Average per thread, summed across inputs (divisor `N`).
    #[must_use]
    pub fn per_thread(&self, thread_count: u64) -> Rollup {
        self.rollup(thread_count)
    }

    // The +1 keeps sub-divisor sums visible instead of rounding them to
    // nothing, matching the established output format.
    fn rollup(&self, divisor: u64) -> Rollup {
        let divisor = divisor.max(1);
        Rollup {
            iterations: self.iterations / divisor + 1,
            hard_waits: self.hard_waits / divisor + 1,
            soft_waits: self.soft_waits / divisor + 1,
            hard_wakeup_ticks: self.hard_wakeup_ticks / divisor + 1,
            soft_wakeup_ticks: self.soft_wakeup_ticks / divisor + 1,
        }
    }
}

/// One averaged view of [`RunTotals`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rollup {
    /// Averaged spin/monitor-wait cycles.
    pub iterations: u64,
    /// Averaged hard waits.
    pub hard_waits: u64,
    /// Averaged soft waits.
    pub soft_waits: u64,
    /// Averaged hard-wait wakeup ticks.
    pub hard_wakeup_ticks: u64,
    /// Averaged soft-wait wakeup ticks.
    pub soft_wakeup_ticks: u64,
}

/// Signed difference between hard and soft wakeup time: sign character
/// (space for non-negative, `-` otherwise) plus magnitude.
#[must_use]
pub fn diff_wake_time(hard: u64, soft: u64) -> (char, u64) {
    if hard < soft {
        ('-', soft - hard)
    } else {
        (' ', hard - soft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(iterations: u64, hard: usize, soft: usize, hard_ticks: u64, soft_ticks: u64) -> WorkerReport {
        WorkerReport {
            total_iterations: iterations,
            hard_wait_count: hard,
            soft_wait_count: soft,
            hard_wait_wakeup_ticks: hard_ticks,
            soft_wait_wakeup_ticks: soft_ticks,
            ..WorkerReport::default()
        }
    }

    #[test]
    fn collect_sums_every_field() {
        let reports = vec![report(10, 1, 2, 100, 200), report(30, 3, 4, 300, 400)];
        let totals = RunTotals::collect(&reports);
        assert_eq!(
            totals,
            RunTotals {
                iterations: 40,
                hard_waits: 4,
                soft_waits: 6,
                hard_wakeup_ticks: 400,
                soft_wakeup_ticks: 600,
            }
        );
    }

    #[test]
    fn rollups_divide_and_add_one() {
        let totals = RunTotals {
            iterations: 100,
            hard_waits: 10,
            soft_waits: 20,
            hard_wakeup_ticks: 1_000,
            soft_wakeup_ticks: 2_000,
        };
        let per_unit = totals.per_unit(5, 2);
        assert_eq!(per_unit.iterations, 11);
        assert_eq!(per_unit.hard_waits, 2);

        let per_input = totals.per_input(5);
        assert_eq!(per_input.iterations, 21);
        assert_eq!(per_input.soft_wakeup_ticks, 401);

        let per_thread = totals.per_thread(2);
        assert_eq!(per_thread.iterations, 51);
        assert_eq!(per_thread.hard_wakeup_ticks, 501);
    }

    #[test]
    fn zero_divisor_is_clamped() {
        let totals = RunTotals::default();
        let rollup = totals.per_unit(0, 0);
        assert_eq!(rollup.iterations, 1);
    }

    #[test]
    fn diff_carries_sign_character() {
        assert_eq!(diff_wake_time(10, 4), (' ', 6));
        assert_eq!(diff_wake_time(4, 10), ('-', 6));
        assert_eq!(diff_wake_time(7, 7), (' ', 0));
    }
}
