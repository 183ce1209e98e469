mod minimax;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::common::{Agent, Cell, Path};
use crate::map::Map;

use minimax::MinimaxResolver;

/// Decides which of two colliding agents is replanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ResolutionStrategy {
    /// The agent with the larger priority value yields; on a tie, the larger id.
    #[default]
    #[serde(rename = "priority")]
    #[value(name = "priority")]
    Priority,
    /// Three-ply adversarial search over single-step moves at the collision.
    #[serde(rename = "minimax")]
    #[value(name = "minimax")]
    Minimax,
}

impl ResolutionStrategy {
    /// Returns `(loser, winner)` for a collision of `first` and `second` at
    /// `position` and `time_step`. `first` must have the smaller id.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        &self,
        first: &Agent,
        second: &Agent,
        position: Cell,
        time_step: usize,
        paths: &BTreeMap<usize, Path>,
        map: &Map,
        allow_diagonals: bool,
    ) -> (usize, usize) {
        let loser = match self {
            ResolutionStrategy::Priority => yield_by_priority(first, second),
            ResolutionStrategy::Minimax => {
                match (paths.get(&first.id), paths.get(&second.id)) {
                    (Some(first_path), Some(second_path)) => MinimaxResolver::new(
                        map,
                        allow_diagonals,
                        first,
                        second,
                        time_step,
                    )
                    .resolve(first_path, second_path),
                    _ => yield_by_priority(first, second),
                }
            }
        };
        let winner = if loser == first.id {
            second.id
        } else {
            first.id
        };
        debug!(
            "agents {} and {} collide at {position:?} t={time_step}, agent {loser} yields",
            first.id, second.id
        );
        (loser, winner)
    }
}

fn yield_by_priority(first: &Agent, second: &Agent) -> usize {
    match first.priority.cmp(&second.priority) {
        Ordering::Greater => first.id,
        Ordering::Less => second.id,
        Ordering::Equal => first.id.max(second.id),
    }
}
