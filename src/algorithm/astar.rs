use super::{construct_path, successors, Trace};
use crate::common::{Agent, LowLevelNode, Path};
use crate::map::Map;
use crate::reservation::ReservationTable;
use crate::stat::Stats;

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument, trace};

#[instrument(skip_all, name = "a_star", fields(agent = agent.id, start = format!("{:?}", agent.start), goal = format!("{:?}", agent.goal), horizon = horizon), level = "debug")]
pub(crate) fn a_star_search(
    map: &Map,
    agent: &Agent,
    reservations: &ReservationTable,
    horizon: usize,
    allow_diagonals: bool,
    stats: &mut Stats,
) -> Option<Path> {
    let mut open_list = BTreeSet::new();
    let mut closed_list = HashSet::new();
    let mut trace = Trace::new();
    let mut sequence = 0;

    open_list.insert(LowLevelNode {
        position: agent.start,
        f_cost: agent.start.distance(&agent.goal, allow_diagonals),
        g_cost: 0,
        sequence,
        parent: None,
    });

    while let Some(current) = open_list.pop_first() {
        let state = current.state();
        if current.g_cost > horizon || !closed_list.insert(state) {
            continue;
        }
        trace!("expand node: {current:?}");
        stats.low_level_expand_nodes += 1;

        // Parents are fixed on first expansion, later duplicates are dropped above.
        if let Some(parent) = current.parent {
            trace.insert(state, parent);
        }

        if current.position == agent.goal && current.g_cost == horizon {
            return Some(construct_path(&trace, state));
        }

        for next in successors(map, reservations, agent, state, horizon, allow_diagonals) {
            if closed_list.contains(&next) {
                continue;
            }
            sequence += 1;
            open_list.insert(LowLevelNode {
                position: next.cell,
                f_cost: next.time + next.cell.distance(&agent.goal, allow_diagonals),
                g_cost: next.time,
                sequence,
                parent: Some(state),
            });
        }
    }

    debug!("cannot find solution");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Cell, PriorityStrategy, TimeCell};
    use tracing_subscriber;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn agent(start: (usize, usize), goal: (usize, usize)) -> Agent {
        Agent::new(
            0,
            Cell::new(start.0, start.1),
            Cell::new(goal.0, goal.1),
            PriorityStrategy::YAxis,
        )
    }

    // . . .
    // . @ .
    // . . .
    fn ring_map() -> Map {
        Map::from_matrix(&[vec![0, 0, 0], vec![0, 1, 0], vec![0, 0, 0]]).unwrap()
    }

    #[test]
    fn test_a_star_straight_line() {
        init_tracing();
        let map = Map::from_matrix(&vec![vec![0; 4]; 4]).unwrap();
        let agent = agent((0, 0), (3, 0));
        let table = ReservationTable::new(&map, false);
        let stats = &mut Stats::default();

        let path = a_star_search(&map, &agent, &table, 3, false, stats).unwrap();
        assert_eq!(
            path,
            vec![
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(2, 0),
                Cell::new(3, 0)
            ]
        );
        assert!(stats.low_level_expand_nodes >= 4);
    }

    #[test]
    fn test_a_star_reaches_goal_at_exact_horizon() {
        init_tracing();
        let map = ring_map();
        let agent = agent((0, 0), (2, 0));
        let table = ReservationTable::new(&map, false);
        let stats = &mut Stats::default();

        let path = a_star_search(&map, &agent, &table, 5, false, stats).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 6);
        assert_eq!(path.first(), Some(&Cell::new(0, 0)));
        assert_eq!(path.last(), Some(&Cell::new(2, 0)));
    }

    #[test]
    fn test_a_star_horizon_too_short() {
        init_tracing();
        let map = ring_map();
        let agent = agent((0, 0), (2, 2));
        let table = ReservationTable::new(&map, false);
        let stats = &mut Stats::default();

        assert!(a_star_search(&map, &agent, &table, 3, false, stats).is_none());
        assert!(a_star_search(&map, &agent, &table, 4, false, stats).is_some());
        // Diagonal moves still cannot cut through the obstacle.
        assert!(a_star_search(&map, &agent, &table, 3, true, stats).is_some());
    }

    #[test]
    fn test_a_star_avoids_reservations() {
        init_tracing();
        let map = ring_map();
        let agent = agent((0, 0), (2, 0));
        let mut table = ReservationTable::new(&map, false);
        // Block the top route at time 1, forcing the long way or a wait.
        table.reserve(TimeCell::new(Cell::new(1, 0), 1), 4);
        let stats = &mut Stats::default();

        let path = a_star_search(&map, &agent, &table, 3, false, stats).unwrap();
        debug!("{path:?}");
        assert_eq!(
            path,
            vec![
                Cell::new(0, 0),
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(2, 0)
            ]
        );
        assert!(a_star_search(&map, &agent, &table, 2, false, stats).is_none());
    }

    #[test]
    fn test_a_star_own_reservation_is_allowed() {
        init_tracing();
        let map = ring_map();
        let agent = agent((0, 0), (2, 0));
        let mut table = ReservationTable::new(&map, false);
        table.reserve(TimeCell::new(Cell::new(1, 0), 1), agent.id);
        let stats = &mut Stats::default();

        let path = a_star_search(&map, &agent, &table, 2, false, stats).unwrap();
        assert_eq!(path[1], Cell::new(1, 0));
    }

    #[test]
    fn test_a_star_morphing_restricts_moves() {
        init_tracing();
        let map = Map::from_matrix(&[vec![0, 0, 0, 0]]).unwrap();
        let stats = &mut Stats::default();

        let mut table = ReservationTable::new(&map, true);
        table.reserve(TimeCell::new(Cell::new(0, 0), 0), 0);

        // One step stays next to the only reservation.
        let short = agent((0, 0), (1, 0));
        assert!(a_star_search(&map, &short, &table, 1, false, stats).is_some());

        // Nothing is reserved at time 1, so time 2 is outside the morphic set.
        let long = agent((0, 0), (2, 0));
        assert!(a_star_search(&map, &long, &table, 2, false, stats).is_none());

        table.reserve(TimeCell::new(Cell::new(1, 0), 1), 0);
        assert!(a_star_search(&map, &long, &table, 2, false, stats).is_some());
    }

    #[test]
    fn test_a_star_start_is_goal() {
        init_tracing();
        let map = ring_map();
        let agent = agent((2, 2), (2, 2));
        let table = ReservationTable::new(&map, false);
        let stats = &mut Stats::default();

        assert_eq!(
            a_star_search(&map, &agent, &table, 0, false, stats),
            Some(vec![Cell::new(2, 2)])
        );
        assert_eq!(
            a_star_search(&map, &agent, &table, 2, false, stats),
            Some(vec![Cell::new(2, 2); 3])
        );
    }
}
