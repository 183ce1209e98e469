mod astar;
mod bfs;

pub(crate) use astar::a_star_search;
pub(crate) use bfs::bfs_search;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::{Agent, Path, TimeCell};
use crate::map::Map;
use crate::reservation::ReservationTable;
use crate::stat::Stats;

/// Single-agent search over (cell, time). Both variants share successor
/// generation and acceptance; only the frontier order differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "astar")]
    #[value(name = "astar")]
    AStar,
    #[serde(rename = "bfs")]
    #[value(name = "bfs")]
    Bfs,
}

impl Algorithm {
    /// Finds a path for `agent` that stands on its goal at exactly `horizon`.
    /// Only reads the reservation table.
    pub fn find_path(
        &self,
        map: &Map,
        agent: &Agent,
        reservations: &ReservationTable,
        horizon: usize,
        allow_diagonals: bool,
        stats: &mut Stats,
    ) -> Option<Path> {
        match self {
            Algorithm::AStar => {
                a_star_search(map, agent, reservations, horizon, allow_diagonals, stats)
            }
            Algorithm::Bfs => bfs_search(map, agent, reservations, horizon, allow_diagonals, stats),
        }
    }
}

type Trace = HashMap<TimeCell, TimeCell>;

fn construct_path(trace: &Trace, mut current: TimeCell) -> Path {
    let mut path = vec![current.cell];
    while let Some(&previous) = trace.get(&current) {
        path.push(previous.cell);
        current = previous;
    }
    path.reverse();
    path
}

/// States reachable one step after `current` that the table admits and from
/// which the goal is still reachable by `horizon`.
fn successors(
    map: &Map,
    reservations: &ReservationTable,
    agent: &Agent,
    current: TimeCell,
    horizon: usize,
    allow_diagonals: bool,
) -> Vec<TimeCell> {
    let time = current.time + 1;
    if time > horizon {
        return Vec::new();
    }

    map.get_neighbors(current.cell, allow_diagonals)
        .into_iter()
        .filter(|neighbor| time + neighbor.distance(&agent.goal, allow_diagonals) <= horizon)
        .map(|neighbor| TimeCell::new(neighbor, time))
        .filter(|&next| reservations.admits(next, agent.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Cell, PriorityStrategy};

    #[test]
    fn test_construct_path_follows_trace() {
        let a = TimeCell::new(Cell::new(0, 0), 0);
        let b = TimeCell::new(Cell::new(0, 0), 1);
        let c = TimeCell::new(Cell::new(1, 0), 2);
        let trace = Trace::from([(b, a), (c, b)]);
        assert_eq!(
            construct_path(&trace, c),
            vec![Cell::new(0, 0), Cell::new(0, 0), Cell::new(1, 0)]
        );
    }

    #[test]
    fn test_successors_respect_horizon_and_owners() {
        let map = Map::from_matrix(&[vec![0, 0, 0]]).unwrap();
        let agent = Agent::new(0, Cell::new(0, 0), Cell::new(2, 0), PriorityStrategy::YAxis);
        let mut table = ReservationTable::new(&map, false);
        let start = TimeCell::new(agent.start, 0);

        // Only the move towards the goal keeps horizon 2 reachable.
        let next = successors(&map, &table, &agent, start, 2, false);
        assert_eq!(next, vec![TimeCell::new(Cell::new(1, 0), 1)]);

        table.reserve(TimeCell::new(Cell::new(1, 0), 1), 1);
        assert!(successors(&map, &table, &agent, start, 2, false).is_empty());

        let next = successors(&map, &table, &agent, start, 3, false);
        assert_eq!(next, vec![TimeCell::new(Cell::new(0, 0), 1)]);
    }
}
