// SPDX-License-Identifier: Apache-2.0

//! Errors for the runner crate.

use miette::Diagnostic;

/// Errors that can occur while setting up or finishing a benchmark run.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// Processor enumeration or assignment failed.
    #[error("Topology error: {0}")]
    Topology(#[from] joinmark_topology::error::Error),

    /// `--input_count` must be at least 1; with no rounds the rendezvous is
    /// never armed and the run would never finish.
    #[error("Invalid value '{value}' for '--input_count'. Should be >= 1.")]
    InvalidInputCount {
        /// The rejected value.
        value: u32,
    },

    /// `--thread_count` must be at least 1.
    #[error("Invalid value '{value}' for '--thread_count'. Should be >= 1.")]
    InvalidThreadCount {
        /// The rejected value.
        value: usize,
    },

    /// A monitor-wait discipline was selected without a cycle budget.
    #[error("'--mwaitx_cycle_count' is needed when join_type {join_type} is related to mwaitx.")]
    MissingMwaitxCycles {
        /// The selected join type.
        join_type: u8,
    },

    /// Failed to spawn an OS thread.
    #[error("Failed to spawn thread '{thread_name}': {source}")]
    ThreadSpawn {
        /// Name of the thread we attempted to spawn.
        thread_name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked. The rendezvous is unrecoverable after a
    /// missing arriver, so this is fatal.
    #[error("Worker thread '{thread_name}' panicked: {panic_message}")]
    WorkerPanic {
        /// Name of the panicked thread.
        thread_name: String,
        /// Panic payload, best effort.
        panic_message: String,
    },
}
