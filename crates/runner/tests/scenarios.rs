// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios driving the full coordinator across disciplines.

use joinmark_runner::{Discipline, RunConfig, run};

fn config(
    input_count: u32,
    complexity: u32,
    thread_count: usize,
    discipline: Discipline,
    mwaitx_cycles: Option<u32>,
) -> RunConfig {
    RunConfig {
        input_count,
        complexity,
        thread_count: Some(thread_count),
        discipline,
        mwaitx_cycles,
    }
}

/// Total waiter-resolutions must account for every non-releaser arrival:
/// each of K rounds has exactly one releaser and N-1 waiters.
fn assert_wait_arithmetic(summary: &joinmark_runner::RunSummary, input_count: u64) {
    let thread_count = summary.thread_count as u64;
    assert_eq!(
        summary.totals.hard_waits + summary.totals.soft_waits,
        input_count * (thread_count - 1),
    );
    for report in &summary.reports {
        assert_eq!(report.processed as u64, input_count);
    }
}

#[test]
fn two_threads_one_round_default_discipline() {
    let summary = run(&config(1, 0, 2, Discipline::Pause, None)).unwrap();
    assert_eq!(summary.reports.len(), 2);
    assert_wait_arithmetic(&summary, 1);
}

#[test]
fn pause_soft_only_never_enters_the_kernel() {
    let summary = run(&config(4, 0, 4, Discipline::PauseSoftOnly, None)).unwrap();
    assert_eq!(summary.totals.hard_waits, 0);
    assert_wait_arithmetic(&summary, 4);
}

#[test]
fn hard_only_burns_no_spin_iterations() {
    let summary = run(&config(4, 0, 4, Discipline::HardOnly, None)).unwrap();
    assert_eq!(summary.totals.iterations, 0);
    assert_wait_arithmetic(&summary, 4);
}

#[test]
fn single_thread_is_its_own_releaser_every_round() {
    let summary = run(&config(8, 0, 1, Discipline::Pause, None)).unwrap();
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.totals.hard_waits, 0);
    assert_eq!(summary.totals.soft_waits, 0);
    assert_eq!(summary.totals.iterations, 0);
}

#[test]
fn mwaitx_loop_discipline_completes() {
    let summary = run(&config(2, 5, 4, Discipline::MwaitxLoop, Some(10_000))).unwrap();
    assert_wait_arithmetic(&summary, 2);
}

#[test]
fn mwaitx_no_loop_discipline_completes() {
    let summary = run(&config(3, 0, 4, Discipline::MwaitxNoLoop, Some(5_000))).unwrap();
    assert_wait_arithmetic(&summary, 3);
}

#[test]
fn answers_are_folded_and_survive_the_run() {
    // Inputs 0..4 contain primes, so the fold cannot be zero.
    let summary = run(&config(4, 0, 2, Discipline::Pause, None)).unwrap();
    assert_ne!(summary.answer, 0);
}
