//! Dense-sequence reordering primitives.
//!
//! # Responsibility
//! - Turn "(entity, desired absolute position)" requests into a new order.
//! - Keep remove-then-insert semantics for single moves.
//!
//! # Invariants
//! - Output is a permutation of the input; nothing is added or dropped.
//! - Positions in the output are the new dense `0..N-1` indices.
//! - When several entries want the same slot, the earlier entry keeps it and
//!   later entries shift to the next free slot (forward, then backward).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// One reorder entry: move `id` to absolute position `new_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMove<Id> {
    pub id: Id,
    pub new_index: i64,
}

impl<Id> IndexMove<Id> {
    pub fn new(id: Id, new_index: i64) -> Self {
        Self { id, new_index }
    }
}

/// Rejections from ordering primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError<Id: Debug> {
    #[error("entity {0:?} is not part of the sequence")]
    UnknownId(Id),
    #[error("index {index} is outside 0..={max} for entity {id:?}")]
    IndexOutOfRange { id: Id, index: i64, max: i64 },
}

/// Applies absolute-position requests to `current` and returns the new order.
///
/// Validates every entry before building the result, so an error leaves no
/// partially applied order behind. Unknown ids are reported before any
/// out-of-range index.
pub fn apply_placements<Id>(
    current: &[Id],
    moves: &[IndexMove<Id>],
) -> Result<Vec<Id>, OrderingError<Id>>
where
    Id: Copy + Eq + Hash + Debug,
{
    let len = current.len();
    if let Some(entry) = moves.iter().find(|entry| !current.contains(&entry.id)) {
        return Err(OrderingError::UnknownId(entry.id));
    }
    for entry in moves {
        if entry.new_index < 0 || entry.new_index >= len as i64 {
            return Err(OrderingError::IndexOutOfRange {
                id: entry.id,
                index: entry.new_index,
                max: len as i64 - 1,
            });
        }
    }

    let mut slots: Vec<Option<Id>> = vec![None; len];
    let mut placed = HashSet::new();
    for entry in moves {
        if !placed.insert(entry.id) {
            continue;
        }
        let wanted = entry.new_index as usize;
        let slot = (wanted..len)
            .find(|&slot| slots[slot].is_none())
            .or_else(|| (0..wanted).rev().find(|&slot| slots[slot].is_none()));
        if let Some(slot) = slot {
            slots[slot] = Some(entry.id);
        }
    }

    let mut rest = current.iter().filter(|id| !placed.contains(*id));
    Ok(slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| rest.next().copied()))
        .collect())
}

/// Removes `id` from `sequence`, returning its former position.
pub fn detach<Id: PartialEq>(sequence: &mut Vec<Id>, id: &Id) -> Option<usize> {
    let position = sequence.iter().position(|candidate| candidate == id)?;
    sequence.remove(position);
    Some(position)
}

/// Inserts `id` at `index`, clamped to the end of the sequence.
pub fn insert_at<Id>(sequence: &mut Vec<Id>, id: Id, index: usize) {
    let index = index.min(sequence.len());
    sequence.insert(index, id);
}

#[cfg(test)]
mod tests {
    use super::{apply_placements, detach, insert_at, IndexMove, OrderingError};
    use proptest::prelude::*;

    #[test]
    fn single_move_is_remove_then_insert() {
        let order = apply_placements(&[0, 1, 2, 3], &[IndexMove::new(3, 1)]).unwrap();
        assert_eq!(order, vec![0, 3, 1, 2]);

        let order = apply_placements(&[0, 1, 2, 3], &[IndexMove::new(0, 3)]).unwrap();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn multiple_moves_land_on_their_absolute_slots() {
        let order = apply_placements(
            &['a', 'b', 'c', 'd', 'e'],
            &[IndexMove::new('e', 0), IndexMove::new('a', 4)],
        )
        .unwrap();
        assert_eq!(order, vec!['e', 'b', 'c', 'd', 'a']);
    }

    #[test]
    fn first_listed_wins_a_contested_slot() {
        let order = apply_placements(
            &['a', 'b', 'c', 'd'],
            &[IndexMove::new('c', 0), IndexMove::new('d', 0)],
        )
        .unwrap();
        assert_eq!(order, vec!['c', 'd', 'a', 'b']);
    }

    #[test]
    fn contested_last_slot_shifts_backward() {
        let order = apply_placements(
            &['a', 'b', 'c'],
            &[IndexMove::new('a', 2), IndexMove::new('b', 2)],
        )
        .unwrap();
        assert_eq!(order, vec!['c', 'b', 'a']);
    }

    #[test]
    fn repeated_entity_keeps_first_entry() {
        let order = apply_placements(
            &['a', 'b', 'c'],
            &[IndexMove::new('a', 1), IndexMove::new('a', 2)],
        )
        .unwrap();
        assert_eq!(order, vec!['b', 'a', 'c']);
    }

    #[test]
    fn rejects_unknown_ids_and_out_of_range_indices() {
        assert_eq!(
            apply_placements(&[1, 2], &[IndexMove::new(9, 0)]),
            Err(OrderingError::UnknownId(9))
        );
        assert_eq!(
            apply_placements(&[1, 2], &[IndexMove::new(1, 2)]),
            Err(OrderingError::IndexOutOfRange {
                id: 1,
                index: 2,
                max: 1
            })
        );
        assert!(apply_placements(&[1, 2], &[IndexMove::new(1, -1)]).is_err());
    }

    #[test]
    fn detach_and_insert_close_and_open_gaps() {
        let mut source = vec![10, 11, 12, 13];
        let mut target = vec![20, 21];
        assert_eq!(detach(&mut source, &13), Some(3));
        insert_at(&mut target, 13, 0);
        assert_eq!(source, vec![10, 11, 12]);
        assert_eq!(target, vec![13, 20, 21]);

        insert_at(&mut target, 99, 42);
        assert_eq!(target.last(), Some(&99));
        assert_eq!(detach(&mut target, &7), None);
    }

    proptest! {
        #[test]
        fn placements_are_permutations(
            len in 1usize..12,
            raw in prop::collection::vec((0usize..12, 0i64..12), 0..8),
        ) {
            let current: Vec<usize> = (0..len).collect();
            let moves: Vec<IndexMove<usize>> = raw
                .into_iter()
                .map(|(id, index)| IndexMove::new(id % len, index % len as i64))
                .collect();
            let mut order = apply_placements(&current, &moves).unwrap();
            prop_assert_eq!(order.len(), len);
            order.sort_unstable();
            prop_assert_eq!(order, current);
        }

        #[test]
        fn uncontested_entries_hit_their_targets(len in 2usize..10, id in 0usize..10, index in 0i64..10) {
            let current: Vec<usize> = (0..len).collect();
            let id = id % len;
            let index = index % len as i64;
            let order = apply_placements(&current, &[IndexMove::new(id, index)]).unwrap();
            prop_assert_eq!(order[index as usize], id);
        }
    }
}
