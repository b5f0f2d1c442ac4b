//! In-place merge of a delta into a mirrored collection.

use crate::collection::MirroredCollection;
use livetable_protocol::{Delta, EntityId};
use std::collections::HashSet;

/// What applying a delta did to the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entities that existed and were merged in place.
    pub updated: usize,
    /// Entities appended at the end of the collection.
    pub appended: usize,
    /// Entities removed.
    pub removed: usize,
    /// Contiguous-range deletions performed for the removals.
    pub removal_runs: usize,
}

impl MergeOutcome {
    /// Returns true if the delta changed nothing.
    pub fn is_noop(&self) -> bool {
        self.updated == 0 && self.appended == 0 && self.removed == 0
    }
}

/// Applies a delta to a collection: deterministic and total over a
/// well-formed delta.
///
/// Upserted entities that already exist are merged field-by-field in place,
/// keeping their position; unseen ids are appended at the end regardless of
/// their position in the batch. An id named in both the upserts and the
/// removals ends up absent: removal takes precedence.
pub fn apply_delta(collection: &mut MirroredCollection, delta: &Delta) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let doomed: HashSet<&EntityId> = delta.removed_ids.iter().collect();

    for patch in &delta.upserts {
        if doomed.contains(patch.id()) {
            continue;
        }
        match collection.position(patch.id()) {
            Some(index) => {
                if let Some(entity) = collection.entry_mut(index) {
                    entity.merge_from(patch);
                    outcome.updated += 1;
                }
            }
            None => {
                if collection.push(patch.clone()) {
                    outcome.appended += 1;
                }
            }
        }
    }

    let (removed, runs) = remove_ids(collection, &delta.removed_ids);
    outcome.removed = removed;
    outcome.removal_runs = runs;
    outcome
}

/// Removes the entities with the given ids, batching adjacent positions.
///
/// Positions are resolved up front, sorted ascending, and grouped into
/// maximal contiguous runs; each run is deleted as a single range, with later
/// runs shifted left by the count already removed. The end state is identical
/// to removing the ids one by one, without the repeated shifting that makes
/// one-by-one removal quadratic for large batches. Absent ids are no-ops.
///
/// Returns the number of entities removed and the number of range deletions.
fn remove_ids(collection: &mut MirroredCollection, ids: &[EntityId]) -> (usize, usize) {
    let mut positions: Vec<usize> = ids
        .iter()
        .filter_map(|id| collection.position(id))
        .collect();
    positions.sort_unstable();
    positions.dedup();

    let mut removed = 0;
    let mut runs = 0;
    let mut index = 0;
    while index < positions.len() {
        let run_start = positions[index];
        let mut run_len = 1;
        while index + run_len < positions.len()
            && positions[index + run_len] == run_start + run_len
        {
            run_len += 1;
        }

        let start = run_start - removed;
        collection.remove_range(start..start + run_len);

        removed += run_len;
        runs += 1;
        index += run_len;
    }

    (removed, runs)
}
