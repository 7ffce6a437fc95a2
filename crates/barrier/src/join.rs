// SPDX-License-Identifier: Apache-2.0

//! The join barrier: an N-way reusable rendezvous with seven wait disciplines.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::counter;
use crate::event::WaitEvent;
use crate::hint;

/// Upper bound on soft-wait loop iterations before a waiter escalates.
pub const SPIN_COUNT: u32 = 8 * 1024;

/// Sentinel stored in the releaser slot before the first round completes.
const NO_RELEASER: usize = usize::MAX;

/// Waiting discipline run by a [`JoinBarrier`].
///
/// The numbering in the doc comments is the CLI `--join_type` selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// 1: spin with a pause hint, escalate to the kernel event.
    Pause,
    /// 2: spin with a pause hint, never leave userspace.
    PauseSoftOnly,
    /// 3: spin with `monitorx`/`mwaitx` inside the loop, escalate to the
    /// kernel event.
    MwaitxLoop,
    /// 4: spin with `monitorx`/`mwaitx` inside the loop, never leave
    /// userspace.
    MwaitxLoopSoftOnly,
    /// 5: a single `monitorx`/`mwaitx` per pass, escalate to the kernel
    /// event.
    MwaitxNoLoop,
    /// 6: a single `monitorx`/`mwaitx` per pass, never leave userspace.
    MwaitxNoLoopSoftOnly,
    /// 7: block in the kernel event immediately, no spin phase.
    HardOnly,
}

impl Discipline {
    /// Maps the CLI `--join_type` selector to a discipline.
    #[must_use]
    pub const fn from_join_type(join_type: u8) -> Option<Self> {
        Some(match join_type {
            1 => Self::Pause,
            2 => Self::PauseSoftOnly,
            3 => Self::MwaitxLoop,
            4 => Self::MwaitxLoopSoftOnly,
            5 => Self::MwaitxNoLoop,
            6 => Self::MwaitxNoLoopSoftOnly,
            7 => Self::HardOnly,
            _ => return None,
        })
    }

    /// The CLI selector for this discipline.
    #[must_use]
    pub const fn join_type(self) -> u8 {
        match self {
            Self::Pause => 1,
            Self::PauseSoftOnly => 2,
            Self::MwaitxLoop => 3,
            Self::MwaitxLoopSoftOnly => 4,
            Self::MwaitxNoLoop => 5,
            Self::MwaitxNoLoopSoftOnly => 6,
            Self::HardOnly => 7,
        }
    }

    /// Whether waiters may escalate to the kernel event.
    #[must_use]
    pub const fn uses_event(self) -> bool {
        matches!(
            self,
            Self::Pause | Self::MwaitxLoop | Self::MwaitxNoLoop | Self::HardOnly
        )
    }

    /// Whether the discipline issues `monitorx`/`mwaitx` and therefore needs
    /// a cycle bound.
    #[must_use]
    pub const fn uses_mwaitx(self) -> bool {
        matches!(
            self,
            Self::MwaitxLoop
                | Self::MwaitxLoopSoftOnly
                | Self::MwaitxNoLoop
                | Self::MwaitxNoLoopSoftOnly
        )
    }
}

/// Outcome of one [`JoinBarrier::join`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaitSample {
    /// Spin or monitor-wait cycles consumed while waiting.
    pub iterations: u64,
    /// True iff the thread blocked in the kernel event.
    pub hard_wait: bool,
}

/// In-loop hint flavor shared by the spin-phase disciplines.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SpinHint {
    Pause,
    Mwaitx,
}

/// A reusable N-way rendezvous.
///
/// One instance is shared by all workers of a run. `join_lock` counts down
/// arrivals; the arriver that drives it to zero is the round's releaser and
/// re-arms the barrier through [`restart`](Self::restart). `lock_color` is a
/// generation counter: waiters sample it on entry and recognize release by
/// observing any change, which makes the barrier reusable without a reset
/// handshake. Wrapping is fine; only inequality is ever tested.
pub struct JoinBarrier {
    join_lock: AtomicI32,
    lock_color: AtomicU32,
    releaser: AtomicUsize,
    restart_tick: AtomicU64,
    wait_event: WaitEvent,
    done: Mutex<bool>,
    done_cv: Condvar,
    n_threads: i32,
    discipline: Discipline,
    mwaitx_cycles: u32,
}

impl JoinBarrier {
    /// Creates a barrier for `n_threads` arrivers running `discipline`.
    ///
    /// `mwaitx_cycles` bounds each `mwaitx` stall and is ignored by
    /// disciplines that never issue the instruction.
    #[must_use]
    pub fn new(n_threads: usize, discipline: Discipline, mwaitx_cycles: u32) -> Self {
        let n_threads = i32::try_from(n_threads).expect("barrier arity must fit in i32");
        Self {
            join_lock: AtomicI32::new(n_threads),
            lock_color: AtomicU32::new(0),
            releaser: AtomicUsize::new(NO_RELEASER),
            restart_tick: AtomicU64::new(0),
            wait_event: WaitEvent::new(),
            done: Mutex::new(false),
            done_cv: Condvar::new(),
            n_threads,
            discipline,
            mwaitx_cycles,
        }
    }

    /// The barrier arity.
    #[must_use]
    pub fn n_threads(&self) -> usize {
        usize::try_from(self.n_threads).expect("arity was constructed from usize")
    }

    /// The discipline this barrier runs.
    #[must_use]
    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Arrives at the barrier for the round processing `input_index`.
    ///
    /// Returns once the round is released. The releaser returns without
    /// waiting; every other arriver waits according to the discipline and
    /// reports how the wait resolved.
    pub fn join(&self, input_index: usize, worker_id: usize) -> WaitSample {
        let color_in = self.lock_color.load(Ordering::Acquire);
        let prev = self.join_lock.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            // Releaser fast path. Clearing the previous round's signal here
            // is race-free: a thread can only drive the lock to zero once
            // every earlier waiter has left the event and re-arrived.
            if self.discipline.uses_event() {
                self.wait_event.reset();
            }
            self.releaser.store(worker_id, Ordering::Release);
            tracing::trace!(worker_id, input_index, "released the join");
            return WaitSample::default();
        }

        if self.lock_color.load(Ordering::Acquire) != color_in {
            // The round was released while we were decrementing.
            return WaitSample::default();
        }

        match self.discipline {
            Discipline::Pause => self.wait_spin(color_in, SpinHint::Pause, true),
            Discipline::PauseSoftOnly => self.wait_spin(color_in, SpinHint::Pause, false),
            Discipline::MwaitxLoop => self.wait_spin(color_in, SpinHint::Mwaitx, true),
            Discipline::MwaitxLoopSoftOnly => self.wait_spin(color_in, SpinHint::Mwaitx, false),
            Discipline::MwaitxNoLoop => self.wait_monitor_once(color_in, true),
            Discipline::MwaitxNoLoopSoftOnly => self.wait_monitor_once(color_in, false),
            Discipline::HardOnly => self.wait_hard(color_in),
        }
    }

    /// True on the thread that released the most recent round.
    #[must_use]
    pub fn joined(&self, worker_id: usize) -> bool {
        self.releaser.load(Ordering::Acquire) == worker_id
    }

    /// Publishes the release of the current round. Releaser only.
    ///
    /// `join_lock` must be re-primed before the color advances, and the color
    /// must advance before the event is set; reordering either pair loses
    /// wakeups or double-counts arrivals.
    pub fn restart(&self, worker_id: usize, input_index: usize, is_last_round: bool) {
        tracing::trace!(worker_id, input_index, is_last_round, "restarting the join");
        if !is_last_round {
            self.join_lock.store(self.n_threads, Ordering::SeqCst);
        }
        self.restart_tick.store(counter::now(), Ordering::Relaxed);
        let _ = self.lock_color.fetch_add(1, Ordering::Release);
        if self.discipline.uses_event() {
            self.wait_event.set();
        }
        if is_last_round {
            let mut done = self.done.lock();
            *done = true;
            let _ = self.done_cv.notify_all();
        }
    }

    /// Blocks the caller until the final round's releaser signals completion.
    ///
    /// Intended for the coordinator, which is not an arriver.
    pub fn wait_for_threads(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.done_cv.wait(&mut done);
        }
    }

    /// Ticks elapsed since the most recent restart.
    ///
    /// Read by a released waiter immediately on return from
    /// [`join`](Self::join) to attribute its wakeup latency. The ticks come
    /// from an unsynchronized per-core counter, so the metric is noisy by
    /// design.
    #[must_use]
    pub fn ticks_since_restart(&self) -> u64 {
        counter::now().wrapping_sub(self.restart_tick.load(Ordering::Relaxed))
    }

    /// Spin-phase wait shared by disciplines 1-4.
    ///
    /// The outer loop is the late-arriver guard: a waiter that exhausts its
    /// spin budget (or passes through a stale event signal) re-enters the
    /// spin phase as long as the color has not changed. It terminates because
    /// the releaser flips the color in bounded time.
    fn wait_spin(&self, color_in: u32, spin_hint: SpinHint, escalate: bool) -> WaitSample {
        let mut sample = WaitSample::default();
        loop {
            let mut j = 0u32;
            while j < SPIN_COUNT {
                if spin_hint == SpinHint::Mwaitx {
                    hint::monitor_arm(&self.lock_color);
                }
                if self.lock_color.load(Ordering::Acquire) != color_in {
                    sample.iterations += u64::from(j);
                    return sample;
                }
                match spin_hint {
                    SpinHint::Pause => hint::cpu_relax(),
                    SpinHint::Mwaitx => hint::monitor_wait(self.mwaitx_cycles),
                }
                j += 1;
            }
            sample.iterations += u64::from(SPIN_COUNT);

            if escalate && self.lock_color.load(Ordering::Acquire) == color_in {
                sample.hard_wait = true;
                self.wait_event.block_until_set();
            }
            if self.lock_color.load(Ordering::Acquire) != color_in {
                return sample;
            }
        }
    }

    /// Single monitor/wait per pass (disciplines 5 and 6).
    fn wait_monitor_once(&self, color_in: u32, escalate: bool) -> WaitSample {
        let mut sample = WaitSample::default();
        loop {
            hint::monitor_arm(&self.lock_color);
            hint::monitor_wait(self.mwaitx_cycles);
            if escalate {
                sample.iterations += 1;
                if self.lock_color.load(Ordering::Acquire) == color_in {
                    sample.hard_wait = true;
                    self.wait_event.block_until_set();
                }
            }
            if self.lock_color.load(Ordering::Acquire) != color_in {
                return sample;
            }
        }
    }

    /// Immediate kernel wait, no spin phase (discipline 7).
    fn wait_hard(&self, color_in: u32) -> WaitSample {
        let mut sample = WaitSample::default();
        loop {
            if self.lock_color.load(Ordering::Acquire) == color_in {
                sample.hard_wait = true;
                self.wait_event.block_until_set();
            }
            if self.lock_color.load(Ordering::Acquire) != color_in {
                return sample;
            }
        }
    }
}
