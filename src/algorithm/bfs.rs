use super::{construct_path, successors, Trace};
use crate::common::{Agent, LowLevelNode, Path};
use crate::map::Map;
use crate::reservation::ReservationTable;
use crate::stat::Stats;

use std::collections::{HashSet, VecDeque};
use tracing::{debug, instrument, trace};

/// Layer-by-layer variant of the time-expanded search. No heuristic steers
/// the frontier; it only bounds which states can still finish on time.
#[instrument(skip_all, name = "bfs", fields(agent = agent.id, start = format!("{:?}", agent.start), goal = format!("{:?}", agent.goal), horizon = horizon), level = "debug")]
pub(crate) fn bfs_search(
    map: &Map,
    agent: &Agent,
    reservations: &ReservationTable,
    horizon: usize,
    allow_diagonals: bool,
    stats: &mut Stats,
) -> Option<Path> {
    let mut queue = VecDeque::new();
    let mut closed_list = HashSet::new();
    let mut trace = Trace::new();
    let mut sequence = 0;

    queue.push_back(LowLevelNode {
        position: agent.start,
        f_cost: 0,
        g_cost: 0,
        sequence,
        parent: None,
    });

    while let Some(current) = queue.pop_front() {
        let state = current.state();
        if current.g_cost > horizon || !closed_list.insert(state) {
            continue;
        }
        trace!("expand node: {current:?}");
        stats.low_level_expand_nodes += 1;

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
            queue.push_back(LowLevelNode {
                position: next.cell,
                f_cost: next.time,
                g_cost: next.time,
                sequence,
                parent: Some(state),
            });
        }
    }

    debug!("cannot find solution");
    None
}
