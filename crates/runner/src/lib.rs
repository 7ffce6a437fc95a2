// SPDX-License-Identifier: Apache-2.0

//! Coordinator for the join barrier benchmark.
//!
//! Builds the selected barrier variant, provisions one pinned worker thread
//! per core, holds them at a start gate until every thread is placed, then
//! releases the pool and waits for the final round to complete. Per-worker
//! statistics come back through the thread join handles, a strict handoff:
//! the coordinator never touches a report while its worker is alive.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpu_time::ProcessTime;
use joinmark_barrier::{JoinBarrier, counter, event::WaitEvent, hint};
use joinmark_telemetry::{RunTotals, WorkerReport};
use rand::RngExt;

pub use crate::error::Error;
pub use joinmark_barrier::Discipline;

pub mod error;
pub mod workload;

mod worker;

use crate::worker::Worker;

/// Validated parameters of one benchmark run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Workload items per thread (K).
    pub input_count: u32,
    /// Input magnitude exponent, `0..=31`.
    pub complexity: u32,
    /// Worker threads; defaults to every logical processor in every group.
    pub thread_count: Option<usize>,
    /// Wait discipline to benchmark.
    pub discipline: Discipline,
    /// Cycle bound for `mwaitx`; required by the monitor-wait disciplines.
    pub mwaitx_cycles: Option<u32>,
}

/// Aggregated outcome of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// Per-worker statistics, ordered by worker id.
    pub reports: Vec<WorkerReport>,
    /// Sums across all workers.
    pub totals: RunTotals,
    /// Workload answers folded across all workers.
    pub answer: u32,
    /// Worker threads that ran.
    pub thread_count: usize,
    /// Ticks from gate-open to completion.
    pub elapsed_ticks: u64,
    /// Wall time from gate-open to completion.
    pub elapsed: Duration,
    /// Process CPU time consumed, when the platform reports it.
    pub cpu_time: Option<Duration>,
}

/// Runs the benchmark described by `config` and returns the aggregates.
pub fn run(config: &RunConfig) -> Result<RunSummary, Error> {
    if config.input_count == 0 {
        return Err(Error::InvalidInputCount {
            value: config.input_count,
        });
    }
    let complexity = config.complexity % 32;

    let mwaitx_cycles = resolve_mwaitx_cycles(config)?;

    let cores = joinmark_topology::logical_processors()?;
    let thread_count = config.thread_count.unwrap_or(cores.len());
    if thread_count == 0 {
        return Err(Error::InvalidThreadCount {
            value: thread_count,
        });
    }

    let groups = joinmark_topology::group_count(cores.len());
    tracing::info!(
        numbers = config.input_count,
        complexity,
        join_type = config.discipline.join_type(),
        threads = thread_count,
        processor_groups = groups,
        "running"
    );

    let assigned = match joinmark_topology::assign_one_per_core(cores.clone(), thread_count) {
        Ok(assigned) => assigned,
        Err(joinmark_topology::error::Error::NotEnoughCores {
            requested,
            available,
        }) => {
            tracing::warn!(
                requested,
                available,
                "more threads than cores; wrapping the core assignment"
            );
            (0..thread_count).map(|i| cores[i % cores.len()]).collect()
        }
        Err(err) => return Err(err.into()),
    };

    let barrier = Arc::new(JoinBarrier::new(
        thread_count,
        config.discipline,
        mwaitx_cycles,
    ));
    let start_gate = Arc::new(WaitEvent::new());

    let mut handles = Vec::with_capacity(thread_count);
    for (id, core) in assigned.into_iter().enumerate() {
        let thread_name = format!("worker-{id}");
        let worker = Worker {
            id,
            inputs: make_inputs(config.input_count, complexity),
            barrier: Arc::clone(&barrier),
        };
        let gate = Arc::clone(&start_gate);
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                // Pin before the gate opens so the measured rounds never see
                // a migrating worker.
                let _ = joinmark_topology::pin_current(core);
                gate.block_until_set();
                // A worker that unwound would leave every later round one
                // arriver short, stranding the other workers and the
                // coordinator in the rendezvous forever. Translate any panic
                // into a fatal abort instead.
                match catch_unwind(AssertUnwindSafe(|| worker.run())) {
                    Ok(report) => report,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(
                            worker = id,
                            %message,
                            "worker panicked; aborting to preserve the rendezvous"
                        );
                        std::process::abort();
                    }
                }
            })
            .map_err(|e| Error::ThreadSpawn {
                thread_name: thread_name.clone(),
                source: e,
            })?;
        handles.push((thread_name, handle));
    }

    let cpu_start = ProcessTime::try_now().ok();
    let wall_start = Instant::now();
    let start_tick = counter::now();
    start_gate.set();

    barrier.wait_for_threads();

    let elapsed_ticks = counter::now().wrapping_sub(start_tick);
    let elapsed = wall_start.elapsed();
    let cpu_time = cpu_start.and_then(|start| {
        ProcessTime::try_now()
            .ok()
            .map(|end| end.duration_since(start))
    });

    let mut reports = Vec::with_capacity(handles.len());
    for (thread_name, handle) in handles {
        // Worker panics abort the process at the thread boundary before the
        // rendezvous can deadlock; this mapping is the final guard for any
        // unwind that slips past it.
        let report = handle.join().map_err(|panic| Error::WorkerPanic {
            thread_name,
            panic_message: format!("{panic:?}"),
        })?;
        debug_assert!(report.hard_wait_count <= config.input_count as usize);
        debug_assert!(report.soft_wait_count <= config.input_count as usize);
        reports.push(report);
    }

    let totals = RunTotals::collect(&reports);
    let answer = reports.iter().fold(0u32, |acc, r| acc | r.answer);
    // Keep the folded answers observable so the workload survives the
    // optimizer.
    let _ = std::hint::black_box(answer);

    Ok(RunSummary {
        reports,
        totals,
        answer,
        thread_count,
        elapsed_ticks,
        elapsed,
        cpu_time,
    })
}

/// Best-effort extraction of a panic payload for the abort log line.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Applies the mwaitx argument rules: required for the monitor-wait
/// disciplines, warned about and ignored everywhere else.
fn resolve_mwaitx_cycles(config: &RunConfig) -> Result<u32, Error> {
    match (config.discipline.uses_mwaitx(), config.mwaitx_cycles) {
        (true, Some(cycles)) => {
            if !hint::monitorx_supported() {
                tracing::warn!(
                    "monitorx/mwaitx is not available on this CPU; the monitor hints fall back to plain spinning"
                );
            }
            Ok(cycles)
        }
        (true, None) => Err(Error::MissingMwaitxCycles {
            join_type: config.discipline.join_type(),
        }),
        (false, Some(_)) => {
            tracing::warn!(
                "'--mwaitx_cycle_count' is specified, but the value is not used by this wait discipline"
            );
            Ok(0)
        }
        (false, None) => Ok(0),
    }
}

/// Builds one worker's private input list.
///
/// Complexity 0 keeps the canonical `0..K` list; otherwise each input is a
/// random draw scaled by `100 + 2^complexity`.
fn make_inputs(input_count: u32, complexity: u32) -> Vec<u32> {
    if complexity == 0 {
        return (0..input_count).collect();
    }
    let mut rng = rand::rng();
    let scale = 100.0 + 2f64.powi(i32::try_from(complexity).expect("complexity is below 32"));
    (0..input_count)
        .map(|_| {
            let draw: f64 = rng.random();
            (draw * scale) as u32
        })
        .collect()
}
