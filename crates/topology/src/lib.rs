// SPDX-License-Identifier: Apache-2.0

//! Processor topology: enumeration, processor-group math, and strict
//! one-thread-per-core affinity assignment.
//!
//! Worker threads are pinned to distinct logical processors so that spin and
//! wakeup measurements are not distorted by migration. Group accounting
//! follows the Windows convention of at most 64 logical processors per
//! processor group; on other platforms the group count is purely
//! informational.

use crate::error::Error;

pub use core_affinity::CoreId;

pub mod error;

/// Logical processors a processor group can hold.
const GROUP_CAPACITY: usize = 64;

/// Enumerates the logical processors of this machine.
pub fn logical_processors() -> Result<Vec<CoreId>, Error> {
    core_affinity::get_core_ids().ok_or(Error::CoreDetectionUnavailable)
}

/// Number of processor groups needed to hold `logical` processors.
#[must_use]
pub fn group_count(logical: usize) -> usize {
    logical.div_ceil(GROUP_CAPACITY)
}

/// True when `logical` processors span more than one processor group.
#[must_use]
pub fn multiple_groups(logical: usize) -> bool {
    group_count(logical) > 1
}

/// Picks `requested` distinct cores for one-thread-per-core pinning, lowest
/// core ids first.
pub fn assign_one_per_core(
    mut available: Vec<CoreId>,
    requested: usize,
) -> Result<Vec<CoreId>, Error> {
    available.sort_by_key(|c| c.id);
    if requested > available.len() {
        return Err(Error::NotEnoughCores {
            requested,
            available: available.len(),
        });
    }
    Ok(available.into_iter().take(requested).collect())
}

/// Pins the calling thread to `core`.
///
/// Best effort: returns false when the platform refuses, in which case the
/// OS keeps scheduling the thread freely and measurements are merely noisier.
pub fn pin_current(core: CoreId) -> bool {
    let pinned = core_affinity::set_for_current(core);
    if !pinned {
        tracing::warn!(core_id = core.id, "failed to set core affinity");
    }
    pinned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cores(ids: &[usize]) -> Vec<CoreId> {
        ids.iter().map(|&id| CoreId { id }).collect()
    }

    fn to_ids(assigned: &[CoreId]) -> Vec<usize> {
        assigned.iter().map(|c| c.id).collect()
    }

    #[test]
    fn assigns_lowest_ids_first() {
        let assigned = assign_one_per_core(cores(&[3, 0, 2, 1]), 2).unwrap();
        assert_eq!(to_ids(&assigned), vec![0, 1]);
    }

    #[test]
    fn assigns_every_core_when_asked() {
        let assigned = assign_one_per_core(cores(&[0, 1, 2, 3]), 4).unwrap();
        assert_eq!(to_ids(&assigned), vec![0, 1, 2, 3]);
    }

    #[test]
    fn rejects_oversubscription() {
        let err = assign_one_per_core(cores(&[0, 1]), 3).unwrap_err();
        match err {
            Error::NotEnoughCores {
                requested,
                available,
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn group_math_follows_the_64_processor_convention() {
        assert_eq!(group_count(1), 1);
        assert_eq!(group_count(64), 1);
        assert_eq!(group_count(65), 2);
        assert_eq!(group_count(128), 2);
        assert!(!multiple_groups(64));
        assert!(multiple_groups(65));
    }
}
