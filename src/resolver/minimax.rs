use std::cmp::{max, min};
use tracing::trace;

use crate::common::{Agent, Cell, Path};
use crate::map::Map;

const SEARCH_DEPTH: usize = 3;
const GOAL_DISTANCE_WEIGHT: i64 = 1;
const PATH_LENGTH_WEIGHT: i64 = 2;
const PRIORITY_WEIGHT: i64 = 3;

/// Alpha-beta search where the two colliding agents alternately pick their
/// cell at the collision time. The lower-id agent maximizes; a leaf score is
/// positive when the state favors it.
pub(super) struct MinimaxResolver<'a> {
    map: &'a Map,
    allow_diagonals: bool,
    maximizer: &'a Agent,
    minimizer: &'a Agent,
    time_step: usize,
    depth: usize,
}

impl<'a> MinimaxResolver<'a> {
    pub(super) fn new(
        map: &'a Map,
        allow_diagonals: bool,
        maximizer: &'a Agent,
        minimizer: &'a Agent,
        time_step: usize,
    ) -> Self {
        MinimaxResolver {
            map,
            allow_diagonals,
            maximizer,
            minimizer,
            time_step,
            depth: SEARCH_DEPTH,
        }
    }

    /// Id of the agent that has to yield.
    pub(super) fn resolve(&self, maximizer_path: &[Cell], minimizer_path: &[Cell]) -> usize {
        let score = self.minimax(
            maximizer_path.to_vec(),
            minimizer_path.to_vec(),
            0,
            true,
            i64::MIN,
            i64::MAX,
        );
        trace!(
            "minimax score {score} for agents {} and {}",
            self.maximizer.id,
            self.minimizer.id
        );

        if score >= 0 {
            self.minimizer.id
        } else {
            self.maximizer.id
        }
    }

    fn minimax(
        &self,
        maximizer_path: Path,
        minimizer_path: Path,
        depth: usize,
        maximizing: bool,
        mut alpha: i64,
        mut beta: i64,
    ) -> i64 {
        if depth >= self.depth {
            return self.evaluate(&maximizer_path, &minimizer_path);
        }

        let moves = if maximizing {
            self.possible_moves(self.maximizer, &maximizer_path)
        } else {
            self.possible_moves(self.minimizer, &minimizer_path)
        };
        if moves.is_empty() {
            return self.evaluate(&maximizer_path, &minimizer_path);
        }

        if maximizing {
            let mut best = i64::MIN;
            for next in moves {
                let eval = self.minimax(
                    self.apply_move(&maximizer_path, next),
                    minimizer_path.clone(),
                    depth + 1,
                    false,
                    alpha,
                    beta,
                );
                best = max(best, eval);
                alpha = max(alpha, eval);
                if beta <= alpha {
                    break;
                }
            }
            best
        } else {
            let mut best = i64::MAX;
            for next in moves {
                let eval = self.minimax(
                    maximizer_path.clone(),
                    self.apply_move(&minimizer_path, next),
                    depth + 1,
                    true,
                    alpha,
                    beta,
                );
                best = min(best, eval);
                beta = min(beta, eval);
                if beta <= alpha {
                    break;
                }
            }
            best
        }
    }

    // Moves into the collision step start from the cell one step earlier.
    fn possible_moves(&self, agent: &Agent, path: &[Cell]) -> Vec<Cell> {
        let current = self
            .time_step
            .checked_sub(1)
            .and_then(|previous| path.get(previous).copied())
            .unwrap_or(agent.start);
        self.map.get_neighbors(current, self.allow_diagonals)
    }

    fn apply_move(&self, path: &[Cell], next: Cell) -> Path {
        let mut path = path.to_vec();
        let last = path.last().copied().unwrap_or(next);
        path.resize(path.len().max(self.time_step + 1), last);
        path[self.time_step] = next;
        path
    }

    fn evaluate(&self, maximizer_path: &[Cell], minimizer_path: &[Cell]) -> i64 {
        let position_at = |path: &[Cell], agent: &Agent| {
            path.get(self.time_step)
                .or(path.last())
                .copied()
                .unwrap_or(agent.start)
        };
        let max_distance =
            position_at(maximizer_path, self.maximizer).manhattan(&self.maximizer.goal) as i64;
        let min_distance =
            position_at(minimizer_path, self.minimizer).manhattan(&self.minimizer.goal) as i64;

        let distance_score = (min_distance - max_distance) * GOAL_DISTANCE_WEIGHT;
        let length_score =
            (minimizer_path.len() as i64 - maximizer_path.len() as i64) * PATH_LENGTH_WEIGHT;
        let priority_score =
            (self.minimizer.priority as i64 - self.maximizer.priority as i64) * PRIORITY_WEIGHT;

        distance_score + length_score + priority_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(xs: &[usize]) -> Path {
        xs.iter().map(|&x| Cell::new(x, 0)).collect()
    }

    fn agent(id: usize, start: usize, goal: usize, priority: usize) -> Agent {
        Agent {
            id,
            start: Cell::new(start, 0),
            goal: Cell::new(goal, 0),
            priority,
        }
    }

    #[test]
    fn test_head_on_collision_follows_priority() {
        let map = Map::from_matrix(&[vec![0; 5]]).unwrap();
        let a = agent(0, 0, 4, 4);
        let b = agent(1, 4, 0, 0);
        let a_path = cells(&[0, 1, 2, 3, 4]);
        let b_path = cells(&[4, 3, 2, 1, 0]);

        let resolver = MinimaxResolver::new(&map, false, &a, &b, 2);
        assert_eq!(resolver.resolve(&a_path, &b_path), 0);

        let a = agent(0, 0, 4, 0);
        let resolver = MinimaxResolver::new(&map, false, &a, &b, 2);
        assert_eq!(resolver.resolve(&a_path, &b_path), 1);
    }

    #[test]
    fn test_agent_close_to_goal_wins_tie() {
        let map = Map::from_matrix(&[vec![0; 5]]).unwrap();
        let a = agent(0, 0, 4, 1);
        // Agent 1 is already parked on its goal at the collision.
        let b = agent(1, 3, 2, 1);
        let a_path = cells(&[0, 1, 2, 3, 4]);
        let b_path = cells(&[3, 2, 2, 2, 2]);

        let resolver = MinimaxResolver::new(&map, false, &a, &b, 2);
        assert_eq!(resolver.resolve(&a_path, &b_path), 0);
    }

    #[test]
    fn test_apply_move_extends_short_path() {
        let map = Map::from_matrix(&[vec![0; 5]]).unwrap();
        let a = agent(0, 0, 1, 0);
        let b = agent(1, 4, 3, 0);
        let resolver = MinimaxResolver::new(&map, false, &a, &b, 3);

        let path = resolver.apply_move(&cells(&[0, 1]), Cell::new(2, 0));
        assert_eq!(path, cells(&[0, 1, 1, 2]));
    }
}
