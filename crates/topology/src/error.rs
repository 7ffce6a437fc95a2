// SPDX-License-Identifier: Apache-2.0

//! Errors for the topology crate.

use miette::Diagnostic;

/// Errors that can occur while enumerating or assigning processors.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// Failed to enumerate available CPU cores on this platform.
    #[error("Failed to get available CPU cores (core detection unavailable on this platform)")]
    CoreDetectionUnavailable,

    /// More one-per-core threads requested than cores exist.
    #[error(
        "Requested {requested} one-per-core threads but only {available} logical processors are available"
    )]
    NotEnoughCores {
        /// Number of distinct cores requested.
        requested: usize,
        /// Number of logical processors detected on this system.
        available: usize,
    },
}
