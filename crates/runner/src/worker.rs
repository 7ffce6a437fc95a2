// SPDX-License-Identifier: Apache-2.0

//! The per-thread worker loop.

use std::sync::Arc;

use joinmark_barrier::JoinBarrier;
use joinmark_telemetry::WorkerReport;

use crate::workload;

/// One worker's slice of the run: its id, its private input list, and a
/// shared handle on the barrier.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) inputs: Vec<u32>,
    pub(crate) barrier: Arc<JoinBarrier>,
}

impl Worker {
    /// Processes every input, rendezvousing after each, and returns the
    /// accumulated statistics.
    ///
    /// The body must not panic: a missing arriver would strand the other
    /// workers in the rendezvous forever.
    pub(crate) fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            ..WorkerReport::default()
        };
        let count = self.inputs.len();

        for (index, &input) in self.inputs.iter().enumerate() {
            tracing::trace!(worker = self.id, index, count, "processing item");
            report.answer |= workload::find_next_prime(input);
            report.processed += 1;

            let sample = self.barrier.join(index, self.id);
            report.total_iterations += sample.iterations;

            if self.barrier.joined(self.id) {
                // Last arriver: re-arm the barrier for everyone.
                self.barrier
                    .restart(self.id, index, report.processed == count);
            } else if sample.hard_wait {
                report.hard_wait_count += 1;
                report.hard_wait_wakeup_ticks += self.barrier.ticks_since_restart();
            } else {
                report.soft_wait_count += 1;
                report.soft_wait_wakeup_ticks += self.barrier.ticks_since_restart();
            }
        }

        tracing::debug!(
            worker = self.id,
            processed = report.processed,
            hard = report.hard_wait_count,
            soft = report.soft_wait_count,
            "worker finished"
        );
        report
    }
}
