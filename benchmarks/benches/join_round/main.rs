// SPDX-License-Identifier: Apache-2.0

//! Benchmark: latency of one join round per wait discipline.

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use joinmark_barrier::{Discipline, JoinBarrier};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 4;
const MWAITX_CYCLES: u32 = 10_000;

/// Spawns `THREADS - 1` helper arrivers that rendezvous forever; the bench
/// thread is the final arriver of every round. The helpers park in the
/// barrier once the measurement stops, so only event-escalating disciplines
/// are benchmarked here (soft-only helpers would keep spinning and distort
/// the following groups).
fn spawn_helpers(barrier: &Arc<JoinBarrier>) {
    for id in 1..THREADS {
        let barrier = Arc::clone(barrier);
        let _ = thread::spawn(move || {
            loop {
                let _ = barrier.join(0, id);
                if barrier.joined(id) {
                    barrier.restart(id, 0, false);
                }
            }
        });
    }
}

fn bench_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_round");
    for (name, discipline) in [
        ("pause", Discipline::Pause),
        ("mwaitx_loop", Discipline::MwaitxLoop),
        ("hard_only", Discipline::HardOnly),
    ] {
        let barrier = Arc::new(JoinBarrier::new(THREADS, discipline, MWAITX_CYCLES));
        spawn_helpers(&barrier);
        let _ = group.bench_function(BenchmarkId::new(name, THREADS), |b| {
            b.iter(|| {
                let sample = barrier.join(0, 0);
                if barrier.joined(0) {
                    barrier.restart(0, 0, false);
                }
                sample
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_round);
criterion_main!(benches);
