// SPDX-License-Identifier: Apache-2.0

//! Reusable N-way join barrier with pluggable wait disciplines.
//!
//! The barrier is a rendezvous for a fixed set of worker threads. Each round,
//! every worker arrives through [`JoinBarrier::join`]; the last arriver (the
//! *releaser*) returns immediately and re-arms the barrier through
//! [`JoinBarrier::restart`], waking everyone else. Reuse across rounds is
//! made race-free by a *lock color*: a generation counter that waiters sample
//! on entry and poll for change, so a barrier re-armed for round `r + 1`
//! can never be confused with the still-draining round `r`.
//!
//! Waiters resolve in one of two ways:
//!
//! - a **soft wait** observes the color change in userspace, inside a spin
//!   loop or a single hardware monitor/wait instruction;
//! - a **hard wait** exhausts its spin budget and blocks in a manual-reset
//!   kernel event until the releaser signals it.
//!
//! Seven [`Discipline`]s plug into the same skeleton, covering pause-hinted
//! spinning, `monitorx`/`mwaitx` assisted waiting, pure kernel blocking, and
//! the soft-only versions of each.

pub mod counter;
pub mod event;
pub mod hint;
mod join;

pub use join::{Discipline, JoinBarrier, SPIN_COUNT, WaitSample};
