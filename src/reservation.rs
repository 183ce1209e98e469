use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::trace;

use crate::common::{Cell, Path, TimeCell};
use crate::map::Map;

/// Time-indexed occupancy: at most one owning agent per (cell, time).
///
/// When morphing is enabled the table also maintains the morphic set, every
/// `TimeCell` one step (8-connected or stay) away from a reserved one. The set
/// only grows with the reservations, so it is extended on every new key rather
/// than rebuilt.
///
/// Tables are never shared between constraint-tree branches: each branch
/// builds its own with [`ReservationTable::from_paths`].
#[derive(Debug, Clone)]
pub struct ReservationTable<'a> {
    map: &'a Map,
    morphing: bool,
    reservations: BTreeMap<TimeCell, usize>,
    forbidden: BTreeSet<TimeCell>,
    morphic: HashSet<TimeCell>,
}

impl<'a> ReservationTable<'a> {
    pub fn new(map: &'a Map, morphing: bool) -> Self {
        ReservationTable {
            map,
            morphing,
            reservations: BTreeMap::new(),
            forbidden: BTreeSet::new(),
            morphic: HashSet::new(),
        }
    }

    /// Snapshot of every path except `excluded`'s, on top of `base`
    /// reservations (carried-over fallback cells).
    pub fn from_paths(
        map: &'a Map,
        morphing: bool,
        base: &BTreeMap<TimeCell, usize>,
        paths: &BTreeMap<usize, Path>,
        excluded: usize,
    ) -> Self {
        let mut table = ReservationTable::new(map, morphing);
        for (&key, &agent) in base {
            table.reserve(key, agent);
        }
        for (&agent, path) in paths.iter().filter(|(agent, _)| **agent != excluded) {
            table.reserve_path(path, agent);
        }
        table
    }

    pub fn is_morphing(&self) -> bool {
        self.morphing
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Records `agent` as owner of `key`, returning the previous owner.
    pub fn reserve(&mut self, key: TimeCell, agent: usize) -> Option<usize> {
        let previous = self.reservations.insert(key, agent);
        if previous.is_none() && self.morphing {
            self.extend_morphic(key);
        }
        previous
    }

    pub fn reserve_path(&mut self, path: &[Cell], agent: usize) {
        for (time, cell) in path.iter().enumerate() {
            self.reserve(TimeCell::new(*cell, time), agent);
        }
    }

    /// Blocks `key` for whoever plans against this table.
    pub fn forbid(&mut self, key: TimeCell) {
        self.forbidden.insert(key);
    }

    pub fn owner(&self, key: &TimeCell) -> Option<usize> {
        self.reservations.get(key).copied()
    }

    pub fn is_morphic(&self, key: &TimeCell) -> bool {
        self.morphic.contains(key)
    }

    /// Whether `agent` may occupy `key`.
    pub fn admits(&self, key: TimeCell, agent: usize) -> bool {
        if self.forbidden.contains(&key) {
            return false;
        }
        if self.owner(&key).is_some_and(|owner| owner != agent) {
            return false;
        }
        !self.morphing || self.morphic.contains(&key)
    }

    /// Greatest (time, cell) owned by `agent`.
    pub fn latest_reservation_of(&self, agent: usize) -> Option<TimeCell> {
        self.reservations
            .iter()
            .rev()
            .find(|(_, owner)| **owner == agent)
            .map(|(&key, _)| key)
    }

    fn extend_morphic(&mut self, key: TimeCell) {
        let time = key.time + 1;
        for neighbor in self.map.morphic_neighbors(key.cell) {
            self.morphic.insert(TimeCell::new(neighbor, time));
        }
        trace!("morphic set size {}", self.morphic.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(width: usize, height: usize) -> Map {
        Map::from_matrix(&vec![vec![0; width]; height]).unwrap()
    }

    #[test]
    fn test_owner_and_admission() {
        let map = open_map(3, 3);
        let mut table = ReservationTable::new(&map, false);
        let key = TimeCell::new(Cell::new(1, 1), 2);

        assert_eq!(table.reserve(key, 0), None);
        assert_eq!(table.reserve(key, 1), Some(0));
        assert_eq!(table.owner(&key), Some(1));
        assert!(table.admits(key, 1));
        assert!(!table.admits(key, 0));
        assert!(table.admits(TimeCell::new(Cell::new(1, 1), 3), 0));

        table.forbid(TimeCell::new(Cell::new(0, 0), 1));
        assert!(!table.admits(TimeCell::new(Cell::new(0, 0), 1), 0));
    }

    #[test]
    fn test_morphic_set_tracks_reservations() {
        let map = Map::from_matrix(&[vec![0, 0, 0], vec![0, 1, 0], vec![0, 0, 0]]).unwrap();
        let mut table = ReservationTable::new(&map, true);
        table.reserve(TimeCell::new(Cell::new(0, 0), 0), 7);

        assert!(table.is_morphic(&TimeCell::new(Cell::new(0, 0), 1)));
        assert!(table.is_morphic(&TimeCell::new(Cell::new(1, 0), 1)));
        assert!(table.is_morphic(&TimeCell::new(Cell::new(0, 1), 1)));
        // Obstacle and wrong time step.
        assert!(!table.is_morphic(&TimeCell::new(Cell::new(1, 1), 1)));
        assert!(!table.is_morphic(&TimeCell::new(Cell::new(1, 0), 2)));

        assert!(table.admits(TimeCell::new(Cell::new(1, 0), 1), 0));
        assert!(!table.admits(TimeCell::new(Cell::new(2, 0), 1), 0));
    }

    #[test]
    fn test_morphic_set_ignored_without_morphing() {
        let map = open_map(3, 1);
        let table = ReservationTable::new(&map, false);
        assert!(table.admits(TimeCell::new(Cell::new(2, 0), 5), 0));
        assert!(!table.is_morphic(&TimeCell::new(Cell::new(2, 0), 5)));
    }

    #[test]
    fn test_latest_reservation_is_deterministic() {
        let map = open_map(4, 4);
        let mut table = ReservationTable::new(&map, false);
        table.reserve(TimeCell::new(Cell::new(0, 0), 0), 3);
        table.reserve(TimeCell::new(Cell::new(3, 0), 4), 3);
        table.reserve(TimeCell::new(Cell::new(1, 0), 4), 3);
        table.reserve(TimeCell::new(Cell::new(2, 2), 9), 1);

        assert_eq!(
            table.latest_reservation_of(3),
            Some(TimeCell::new(Cell::new(3, 0), 4))
        );
        assert_eq!(table.latest_reservation_of(5), None);
    }

    #[test]
    fn test_snapshot_excludes_agent() {
        let map = open_map(3, 1);
        let paths = BTreeMap::from([
            (0, vec![Cell::new(0, 0), Cell::new(1, 0)]),
            (1, vec![Cell::new(2, 0), Cell::new(2, 0)]),
        ]);
        let base = BTreeMap::from([(TimeCell::new(Cell::new(1, 0), 3), 0)]);
        let table = ReservationTable::from_paths(&map, false, &base, &paths, 0);

        assert_eq!(table.len(), 3);
        assert_eq!(table.owner(&TimeCell::new(Cell::new(1, 0), 1)), None);
        assert_eq!(table.owner(&TimeCell::new(Cell::new(2, 0), 1)), Some(1));
        assert_eq!(table.owner(&TimeCell::new(Cell::new(1, 0), 3)), Some(0));
    }
}
