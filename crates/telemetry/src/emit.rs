// SPDX-License-Identifier: Apache-2.0

//! Stdout emission of the benchmark results.
//!
//! The stat lines are the benchmark's product, so this module prints them
//! directly; everything diagnostic elsewhere goes through `tracing`.

#![allow(clippy::print_stdout)]

use crate::{Rollup, RunTotals, WorkerReport, diff_wake_time};

/// Formats the per-thread stat line.
#[must_use]
pub fn format_thread_line(report: &WorkerReport) -> String {
    let (sign, diff) = diff_wake_time(
        report.hard_wait_wakeup_ticks,
        report.soft_wait_wakeup_ticks,
    );
    format!(
        "[Thread #{}] Iterations: {}, HardWait: {}, SoftWait: {}, HardWaitWakeupTime: {}, SoftWaitWakeupTime: {}, Diff: {}{}",
        report.worker_id,
        report.total_iterations,
        report.hard_wait_count,
        report.soft_wait_count,
        report.hard_wait_wakeup_ticks,
        report.soft_wait_wakeup_ticks,
        sign,
        diff,
    )
}

fn format_rollup_line(label: &str, rollup: &Rollup) -> String {
    let (sign, diff) = diff_wake_time(rollup.hard_wakeup_ticks, rollup.soft_wakeup_ticks);
    format!(
        "{label}: Iterations: {}, HardWait: {}, SoftWait: {}, HardWaitWakeupTime: {}, SoftWaitWakeupTime: {}, Diff: {sign}{diff}",
        rollup.iterations,
        rollup.hard_waits,
        rollup.soft_waits,
        rollup.hard_wakeup_ticks,
        rollup.soft_wakeup_ticks,
    )
}

/// Formats the one-line pipe-separated machine-readable summary.
#[must_use]
pub fn format_summary_line(
    input_count: u64,
    complexity: u32,
    thread_count: u64,
    totals: &RunTotals,
    elapsed_ticks: u64,
    elapsed_ms: u128,
) -> String {
    let per_unit = totals.per_unit(input_count, thread_count);
    let per_input = totals.per_input(input_count);
    let per_thread = totals.per_thread(thread_count);
    format!(
        "OUT] {input_count}|{complexity}|{thread_count}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{elapsed_ticks}|{elapsed_ms}",
        per_unit.iterations,
        per_unit.hard_waits,
        per_unit.soft_waits,
        per_unit.hard_wakeup_ticks,
        per_unit.soft_wakeup_ticks,
        per_input.iterations,
        per_input.hard_waits,
        per_input.soft_waits,
        per_input.hard_wakeup_ticks,
        per_input.soft_wakeup_ticks,
        per_thread.iterations,
        per_thread.hard_waits,
        per_thread.soft_waits,
        per_thread.hard_wakeup_ticks,
        per_thread.soft_wakeup_ticks,
    )
}

/// Prints the per-thread stat lines.
pub fn thread_lines(reports: &[WorkerReport]) {
    tracing::debug!(workers = reports.len(), "emitting per-thread stat lines");
    for report in reports {
        println!("{}", format_thread_line(report));
    }
}

/// Prints the three average rollups plus the elapsed figures.
pub fn rollup_block(
    input_count: u64,
    thread_count: u64,
    totals: &RunTotals,
    elapsed_ticks: u64,
    elapsed_ms: u128,
    cpu_ms: Option<u128>,
) {
    println!("-----------------------------------------------------------");
    println!(
        "{}",
        format_rollup_line(
            "Average per input unit (all threads)",
            &totals.per_unit(input_count, thread_count),
        )
    );
    println!(
        "{}",
        format_rollup_line(
            "Average per input number (summed across threads)",
            &totals.per_input(input_count),
        )
    );
    println!(
        "{}",
        format_rollup_line(
            "Average per thread (summed across inputs)",
            &totals.per_thread(thread_count),
        )
    );
    println!("Time taken: {elapsed_ticks} ticks");
    println!("Time difference = {elapsed_ms} milliseconds");
    if let Some(cpu_ms) = cpu_ms {
        println!("Process CPU time = {cpu_ms} milliseconds");
    }
}

/// Prints the one-line summary.
pub fn summary_line(
    input_count: u64,
    complexity: u32,
    thread_count: u64,
    totals: &RunTotals,
    elapsed_ticks: u64,
    elapsed_ms: u128,
) {
    println!(
        "{}",
        format_summary_line(
            input_count,
            complexity,
            thread_count,
            totals,
            elapsed_ticks,
            elapsed_ms,
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn thread_line_carries_the_diff_sign() {
        let report = WorkerReport {
            worker_id: 3,
            total_iterations: 42,
            hard_wait_count: 1,
            soft_wait_count: 2,
            hard_wait_wakeup_ticks: 10,
            soft_wait_wakeup_ticks: 25,
            ..WorkerReport::default()
        };
        assert_eq!(
            format_thread_line(&report),
            "[Thread #3] Iterations: 42, HardWait: 1, SoftWait: 2, HardWaitWakeupTime: 10, SoftWaitWakeupTime: 25, Diff: -15"
        );
    }

    #[test]
    fn summary_line_is_pipe_separated_with_twenty_fields() {
        let totals = RunTotals {
            iterations: 100,
            hard_waits: 4,
            soft_waits: 8,
            hard_wakeup_ticks: 1_000,
            soft_wakeup_ticks: 2_000,
        };
        let line = format_summary_line(4, 5, 2, &totals, 123_456, 789);
        assert!(line.starts_with("OUT] 4|5|2|"));
        assert_eq!(line.split('|').count(), 20);
        assert!(line.ends_with("|123456|789"));
    }
}
