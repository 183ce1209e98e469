use super::{Agent, Cell, Path, TimeCell};
use crate::config::Config;
use crate::map::Map;
use crate::reservation::ReservationTable;
use crate::resolver::ResolutionStrategy;
use crate::stat::Stats;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// First vertex collision found, with the agent designated to replan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conflict {
    pub loser: usize,
    pub winner: usize,
    pub position: Cell,
    pub time_step: usize,
}

/// Forbids `agent_id` from `position` at `time_step` in every descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constraint {
    pub agent_id: usize,
    pub position: Cell,
    pub time_step: usize,
}

impl From<&Conflict> for Constraint {
    fn from(conflict: &Conflict) -> Self {
        Constraint {
            agent_id: conflict.loser,
            position: conflict.position,
            time_step: conflict.time_step,
        }
    }
}

/// Scans agent pairs in ascending id order and, within a pair, time steps in
/// ascending order; the first shared cell is the conflict. Only vertex
/// collisions are reported.
pub fn detect_conflict(
    paths: &BTreeMap<usize, Path>,
    agents: &BTreeMap<usize, Agent>,
    map: &Map,
    strategy: ResolutionStrategy,
    allow_diagonals: bool,
) -> Option<Conflict> {
    for (i, (&first_id, first_path)) in paths.iter().enumerate() {
        for (&second_id, second_path) in paths.iter().skip(i + 1) {
            let Some(time_step) = first_path
                .iter()
                .zip(second_path.iter())
                .position(|(a, b)| a == b)
            else {
                continue;
            };
            let position = first_path[time_step];

            let (loser, winner) = match (agents.get(&first_id), agents.get(&second_id)) {
                (Some(first), Some(second)) => strategy.resolve(
                    first,
                    second,
                    position,
                    time_step,
                    paths,
                    map,
                    allow_diagonals,
                ),
                _ => (second_id, first_id),
            };

            return Some(Conflict {
                loser,
                winner,
                position,
                time_step,
            });
        }
    }
    None
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct HighLevelNode {
    pub(crate) node_id: usize, // creation order, breaks cost ties first-in first-out
    pub(crate) paths: BTreeMap<usize, Path>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) cost: usize, // Sum of path lengths
}

impl Ord for HighLevelNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for HighLevelNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HighLevelNode {
    pub(crate) fn new(node_id: usize, paths: BTreeMap<usize, Path>) -> Self {
        let cost = paths.values().map(Vec::len).sum();
        HighLevelNode {
            node_id,
            paths,
            constraints: Vec::new(),
            cost,
        }
    }

    pub(crate) fn detect_conflict(
        &self,
        agents: &BTreeMap<usize, Agent>,
        map: &Map,
        config: &Config,
    ) -> Option<Conflict> {
        detect_conflict(
            &self.paths,
            agents,
            map,
            config.conflict_resolution,
            config.allow_diagonals,
        )
    }

    /// Replans the conflict's loser against a fresh table built from every
    /// other path, `base` reservations and the loser's accumulated
    /// constraints. Returns `None` when the loser has no path left, which
    /// prunes the branch.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update_constraint(
        &self,
        conflict: &Conflict,
        agents: &BTreeMap<usize, Agent>,
        map: &Map,
        base: &BTreeMap<TimeCell, usize>,
        horizon: usize,
        node_id: usize,
        config: &Config,
        stats: &mut Stats,
    ) -> Option<HighLevelNode> {
        let agent = agents.get(&conflict.loser)?;

        let mut new_constraints = self.constraints.clone();
        new_constraints.push(Constraint::from(conflict));

        let mut reservations =
            ReservationTable::from_paths(map, config.morphing, base, &self.paths, agent.id);
        new_constraints
            .iter()
            .filter(|constraint| constraint.agent_id == agent.id)
            .for_each(|constraint| {
                reservations.forbid(TimeCell::new(constraint.position, constraint.time_step))
            });

        let new_path = config.algorithm.find_path(
            map,
            agent,
            &reservations,
            horizon,
            config.allow_diagonals,
            stats,
        );
        let Some(new_path) = new_path else {
            debug!("prune branch: agent {} cannot avoid {conflict:?}", agent.id);
            return None;
        };
        debug!("update agent {} with path {new_path:?} for conflict {conflict:?}", agent.id);

        let mut new_paths = self.paths.clone();
        let old_length = new_paths.insert(agent.id, new_path.clone()).map_or(0, |p| p.len());
        let new_cost = self.cost - old_length + new_path.len();

        Some(HighLevelNode {
            node_id,
            paths: new_paths,
            constraints: new_constraints,
            cost: new_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PriorityStrategy;

    fn row(xs: &[usize]) -> Path {
        xs.iter().map(|&x| Cell::new(x, 0)).collect()
    }

    fn agents(list: &[(usize, usize, usize)]) -> BTreeMap<usize, Agent> {
        list.iter()
            .map(|&(id, start, goal)| {
                (
                    id,
                    Agent::new(
                        id,
                        Cell::new(start, 0),
                        Cell::new(goal, 1),
                        PriorityStrategy::Manhattan,
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn test_no_conflict() {
        let map = Map::from_matrix(&[vec![0; 4], vec![0; 4]]).unwrap();
        let paths = BTreeMap::from([(0, row(&[0, 1, 2])), (1, row(&[3, 3, 3]))]);
        let agents = agents(&[(0, 0, 2), (1, 3, 3)]);
        assert_eq!(
            detect_conflict(&paths, &agents, &map, ResolutionStrategy::Priority, false),
            None
        );
    }

    #[test]
    fn test_first_pair_first_time() {
        let map = Map::from_matrix(&[vec![0; 4], vec![0; 4]]).unwrap();
        let paths = BTreeMap::from([
            (0, row(&[0, 1, 2, 3])),
            (1, row(&[3, 3, 3, 3])),
            (2, row(&[2, 1, 1, 0])),
        ]);
        let agents = agents(&[(0, 0, 3), (1, 3, 2), (2, 2, 0)]);
        let conflict =
            detect_conflict(&paths, &agents, &map, ResolutionStrategy::Priority, false).unwrap();

        // Pair (0, 1) collides at t=3, before pair (0, 2) is looked at.
        assert_eq!(conflict.position, Cell::new(3, 0));
        assert_eq!(conflict.time_step, 3);
        assert_eq!((conflict.loser, conflict.winner), (0, 1));
    }

    #[test]
    fn test_overlap_limited_to_shorter_path() {
        let map = Map::from_matrix(&[vec![0; 4], vec![0; 4]]).unwrap();
        let paths = BTreeMap::from([(0, row(&[0, 1])), (1, row(&[2, 2, 1]))]);
        let agents = agents(&[(0, 0, 1), (1, 2, 1)]);
        assert!(
            detect_conflict(&paths, &agents, &map, ResolutionStrategy::Priority, false).is_none()
        );
    }

    #[test]
    fn test_node_order_is_cost_then_creation() {
        let a = HighLevelNode::new(0, BTreeMap::from([(0, row(&[0, 1]))]));
        let b = HighLevelNode::new(1, BTreeMap::from([(0, row(&[1, 1]))]));
        let c = HighLevelNode::new(2, BTreeMap::from([(0, row(&[0]))]));
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn test_update_constraint_replans_loser() {
        // . . .
        // . . .
        let map = Map::from_matrix(&[vec![0; 3], vec![0; 3]]).unwrap();
        let agents = BTreeMap::from([
            (
                0,
                Agent::new(0, Cell::new(0, 0), Cell::new(2, 0), PriorityStrategy::YAxis),
            ),
            (
                1,
                Agent::new(1, Cell::new(1, 1), Cell::new(1, 0), PriorityStrategy::YAxis),
            ),
        ]);
        let paths = BTreeMap::from([
            (0, row(&[0, 1, 2])),
            (1, vec![Cell::new(1, 1), Cell::new(1, 0), Cell::new(1, 0)]),
        ]);
        let node = HighLevelNode::new(0, paths);
        let config = Config::default();
        let conflict = node.detect_conflict(&agents, &map, &config).unwrap();
        assert_eq!(conflict.time_step, 1);
        assert_eq!(conflict.loser, 1);

        let stats = &mut Stats::default();
        let child = node
            .update_constraint(&conflict, &agents, &map, &BTreeMap::new(), 2, 1, &config, stats)
            .unwrap();
        assert_eq!(child.node_id, 1);
        assert_eq!(child.cost, node.cost);
        assert_eq!(child.constraints, vec![Constraint::from(&conflict)]);
        assert_eq!(child.paths[&0], node.paths[&0]);
        assert_eq!(
            child.paths[&1],
            vec![Cell::new(1, 1), Cell::new(1, 1), Cell::new(1, 0)]
        );
        assert!(child.detect_conflict(&agents, &map, &config).is_none());
    }

    #[test]
    fn test_update_constraint_prunes_infeasible_branch() {
        let map = Map::from_matrix(&[vec![0, 0, 0]]).unwrap();
        let agents = BTreeMap::from([
            (
                0,
                Agent::new(0, Cell::new(0, 0), Cell::new(2, 0), PriorityStrategy::YAxis),
            ),
            (
                1,
                Agent::new(1, Cell::new(2, 0), Cell::new(0, 0), PriorityStrategy::YAxis),
            ),
        ]);
        let paths = BTreeMap::from([(0, row(&[0, 1, 2])), (1, row(&[2, 1, 0]))]);
        let node = HighLevelNode::new(0, paths);
        let config = Config::default();
        let conflict = node.detect_conflict(&agents, &map, &config).unwrap();

        let stats = &mut Stats::default();
        assert!(node
            .update_constraint(&conflict, &agents, &map, &BTreeMap::new(), 2, 1, &config, stats)
            .is_none());
    }
}
