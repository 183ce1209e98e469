mod highlevel;
mod lowlevel;

pub(crate) use highlevel::HighLevelNode;
pub use highlevel::{detect_conflict, Conflict, Constraint};
pub(crate) use lowlevel::LowLevelNode;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::map::Map;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }

    pub fn manhattan(&self, other: &Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(&self, other: &Cell) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Lower bound on the number of moves between two cells under the
    /// configured connectivity.
    pub fn distance(&self, other: &Cell, allow_diagonals: bool) -> usize {
        if allow_diagonals {
            self.chebyshev(other)
        } else {
            self.manhattan(other)
        }
    }

    pub fn is_adjacent(&self, other: &Cell, allow_diagonals: bool) -> bool {
        if allow_diagonals {
            self.chebyshev(other) == 1
        } else {
            self.manhattan(other) == 1
        }
    }
}

impl From<[usize; 2]> for Cell {
    fn from(value: [usize; 2]) -> Self {
        Cell::new(value[0], value[1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum PriorityStrategy {
    #[default]
    #[serde(rename = "y-axis")]
    #[value(name = "y-axis")]
    YAxis,
    #[serde(rename = "manhattan")]
    #[value(name = "manhattan")]
    Manhattan,
}

impl PriorityStrategy {
    pub fn priority(&self, start: Cell, goal: Cell) -> usize {
        match self {
            PriorityStrategy::YAxis => goal.y,
            PriorityStrategy::Manhattan => start.manhattan(&goal),
        }
    }
}

/// Lower priority value is planned earlier and wins conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: Cell,
    pub goal: Cell,
    pub priority: usize,
}

impl Agent {
    pub fn new(id: usize, start: Cell, goal: Cell, strategy: PriorityStrategy) -> Self {
        Agent {
            id,
            start,
            goal,
            priority: strategy.priority(start, goal),
        }
    }

    pub fn verify(&self, map: &Map) -> bool {
        map.is_passable(self.start) && map.is_passable(self.goal)
    }
}

/// Reservation key: a cell at a discrete time step. Ordered by time first so
/// that ordered maps iterate chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeCell {
    pub time: usize,
    pub cell: Cell,
}

impl TimeCell {
    pub const fn new(cell: Cell, time: usize) -> Self {
        TimeCell { time, cell }
    }
}

pub type Path = Vec<Cell>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub horizon: usize,
    pub paths: BTreeMap<usize, Path>,
}

impl Solution {
    /// Checks every returned path against the grid and against each other:
    /// exact horizon length, start/goal endpoints, legal moves, and no two
    /// agents on the same cell at the same time.
    pub fn verify(&self, map: &Map, agents: &[Agent], allow_diagonals: bool) -> bool {
        if self.paths.len() != agents.len() {
            return false;
        }

        for agent in agents {
            let Some(path) = self.paths.get(&agent.id) else {
                return false;
            };
            if path.len() != self.horizon + 1
                || path.first() != Some(&agent.start)
                || path.last() != Some(&agent.goal)
            {
                return false;
            }
            if path.iter().any(|cell| !map.is_passable(*cell)) {
                return false;
            }
            if path
                .windows(2)
                .any(|step| step[0] != step[1] && !step[0].is_adjacent(&step[1], allow_diagonals))
            {
                return false;
            }
        }

        for time in 0..=self.horizon {
            let mut occupied = HashSet::new();
            for path in self.paths.values() {
                if !occupied.insert(path[time]) {
                    return false;
                }
            }
        }

        true
    }
}
