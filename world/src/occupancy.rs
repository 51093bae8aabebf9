//! Reference-counted tracking of cells blocked by footprint-bearing occupants.

use std::collections::BTreeMap;

use switchback_core::ObstacleId;

/// Dense per-cell block counts plus the footprint recorded for each occupant.
///
/// Footprints are stored as sorted, de-duplicated cell indices so that moves
/// can be applied as a symmetric difference instead of a full rebuild.
#[derive(Clone, Debug, Default)]
pub(crate) struct OccupantRegistry {
    blocked: Vec<u16>,
    footprints: BTreeMap<ObstacleId, Vec<usize>>,
}

impl OccupantRegistry {
    pub(crate) fn new(cell_count: usize) -> Self {
        Self {
            blocked: vec![0; cell_count],
            footprints: BTreeMap::new(),
        }
    }

    /// Records or replaces the occupant's footprint, returning the indices
    /// whose block count changed. Unknown occupants start from an empty
    /// footprint.
    pub(crate) fn update(&mut self, occupant: ObstacleId, cells: Vec<usize>) -> Vec<usize> {
        let next = normalise(cells, self.blocked.len());
        let previous = self.footprints.remove(&occupant).unwrap_or_default();
        let (removed, added) = symmetric_difference(&previous, &next);

        for &index in &removed {
            self.blocked[index] = self.blocked[index].saturating_sub(1);
        }
        for &index in &added {
            self.blocked[index] = self.blocked[index].saturating_add(1);
        }

        let _ = self.footprints.insert(occupant, next);

        let mut touched = removed;
        touched.extend(added);
        touched.sort_unstable();
        touched
    }

    /// Forgets the occupant, returning the indices it used to block.
    pub(crate) fn unregister(&mut self, occupant: ObstacleId) -> Option<Vec<usize>> {
        let previous = self.footprints.remove(&occupant)?;
        for &index in &previous {
            self.blocked[index] = self.blocked[index].saturating_sub(1);
        }
        Some(previous)
    }

    pub(crate) fn is_registered(&self, occupant: ObstacleId) -> bool {
        self.footprints.contains_key(&occupant)
    }

    pub(crate) fn is_blocked(&self, index: usize) -> bool {
        self.blocked.get(index).is_some_and(|count| *count > 0)
    }

    /// Reports whether any occupant other than `occupant` blocks the index.
    pub(crate) fn is_blocked_by_other(&self, index: usize, occupant: ObstacleId) -> bool {
        let Some(&count) = self.blocked.get(index) else {
            return false;
        };
        let own = self
            .footprints
            .get(&occupant)
            .is_some_and(|cells| cells.binary_search(&index).is_ok());
        count > u16::from(own)
    }

    pub(crate) fn footprint(&self, occupant: ObstacleId) -> Option<&[usize]> {
        self.footprints.get(&occupant).map(Vec::as_slice)
    }

    /// Indices with at least one blocking occupant, ascending.
    pub(crate) fn blocked_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(index, _)| index)
    }

    /// Occupants in ascending identifier order.
    pub(crate) fn occupants(&self) -> impl Iterator<Item = ObstacleId> + '_ {
        self.footprints.keys().copied()
    }
}

fn normalise(mut cells: Vec<usize>, cell_count: usize) -> Vec<usize> {
    cells.retain(|index| *index < cell_count);
    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Splits two sorted sets into `(only_in_previous, only_in_next)`.
fn symmetric_difference(previous: &[usize], next: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut removed = Vec::new();
    let mut added = Vec::new();
    let (mut left, mut right) = (0, 0);

    while left < previous.len() && right < next.len() {
        match previous[left].cmp(&next[right]) {
            std::cmp::Ordering::Less => {
                removed.push(previous[left]);
                left += 1;
            }
            std::cmp::Ordering::Greater => {
                added.push(next[right]);
                right += 1;
            }
            std::cmp::Ordering::Equal => {
                left += 1;
                right += 1;
            }
        }
    }
    removed.extend_from_slice(&previous[left..]);
    added.extend_from_slice(&next[right..]);

    (removed, added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_touches_only_changed_cells() {
        let mut registry = OccupantRegistry::new(10);
        let occupant = ObstacleId::new(1);

        assert_eq!(registry.update(occupant, vec![1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(registry.update(occupant, vec![2, 3, 4]), vec![1, 4]);

        assert!(!registry.is_blocked(1));
        assert!(registry.is_blocked(2));
        assert!(registry.is_blocked(4));
    }

    #[test]
    fn overlapping_occupants_keep_shared_cells_blocked() {
        let mut registry = OccupantRegistry::new(6);
        let first = ObstacleId::new(1);
        let second = ObstacleId::new(2);

        let _ = registry.update(first, vec![0, 1]);
        let _ = registry.update(second, vec![1, 2]);
        assert_eq!(registry.unregister(first), Some(vec![0, 1]));

        assert!(!registry.is_blocked(0));
        assert!(registry.is_blocked(1));
        assert_eq!(registry.blocked_indices().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn own_footprint_is_ignored_when_asked() {
        let mut registry = OccupantRegistry::new(4);
        let first = ObstacleId::new(1);
        let second = ObstacleId::new(2);
        let _ = registry.update(first, vec![0, 1]);
        let _ = registry.update(second, vec![1]);

        assert!(!registry.is_blocked_by_other(0, first));
        assert!(registry.is_blocked_by_other(1, first));
        assert!(registry.is_blocked_by_other(0, second));
    }

    #[test]
    fn out_of_range_and_duplicate_indices_are_dropped() {
        let mut registry = OccupantRegistry::new(3);
        let occupant = ObstacleId::new(9);

        assert_eq!(registry.update(occupant, vec![2, 2, 7, 0]), vec![0, 2]);
        assert_eq!(registry.footprint(occupant), Some(&[0, 2][..]));
        assert!(registry.is_registered(occupant));
        assert_eq!(registry.unregister(ObstacleId::new(4)), None);
    }

    #[test]
    fn symmetric_difference_splits_sorted_sets() {
        let (removed, added) = symmetric_difference(&[1, 3, 5, 7], &[2, 3, 7, 8]);
        assert_eq!(removed, vec![1, 5]);
        assert_eq!(added, vec![2, 8]);
    }
}
