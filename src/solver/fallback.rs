use crate::common::{Agent, Cell, TimeCell};
use crate::map::Map;
use crate::reservation::ReservationTable;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Relief reservations that survive full solve restarts, and the horizon
/// slack they have bought so far.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fallback {
    reservations: BTreeMap<TimeCell, usize>,
    extension: usize,
}

impl Fallback {
    pub(crate) fn new() -> Self {
        Fallback::default()
    }

    /// Steps added on top of the base horizon.
    pub(crate) fn extension(&self) -> usize {
        self.extension
    }

    pub(crate) fn reservations(&self) -> &BTreeMap<TimeCell, usize> {
        &self.reservations
    }

    /// Records one relief cell for `agent`, one step after its latest
    /// reservation in `table`, and grows the horizon. Two agents contending
    /// for the same relief cell cost an extra step.
    pub(crate) fn relieve(&mut self, agent: &Agent, table: &ReservationTable, map: &Map) -> TimeCell {
        let latest = table
            .latest_reservation_of(agent.id)
            .unwrap_or(TimeCell::new(agent.start, 0));
        let time = latest.time + 1;

        let candidates = relief_candidates(latest.cell, agent.goal, map);
        let cell = if table.is_morphing() {
            candidates
                .iter()
                .copied()
                .find(|&cell| table.is_morphic(&TimeCell::new(cell, time)))
                .or(candidates.first().copied())
        } else {
            candidates.first().copied()
        }
        .unwrap_or(latest.cell);

        let relief = TimeCell::new(cell, time);
        let previous = self.reservations.insert(relief, agent.id);
        let growth = match previous {
            Some(owner) => {
                warn!("agents {owner} and {} contend for relief cell {relief:?}", agent.id);
                2
            }
            None => 1,
        };
        self.extension += growth;
        debug!(
            "agent {} relieved at {relief:?}, horizon extension now {}",
            agent.id, self.extension
        );

        relief
    }
}

/// Cells one step from `from` towards `goal`: the axis with the larger gap
/// first (y on a tie), then the other one. Blocked or out-of-bounds steps are
/// skipped.
fn relief_candidates(from: Cell, goal: Cell, map: &Map) -> Vec<Cell> {
    let toward = |current: usize, target: usize| match current.cmp(&target) {
        Ordering::Less => Some(1),
        Ordering::Greater => Some(-1),
        Ordering::Equal => None,
    };
    let x_step = toward(from.x, goal.x).map(|dx| (dx, 0));
    let y_step = toward(from.y, goal.y).map(|dy| (0, dy));

    let steps = if from.x.abs_diff(goal.x) > from.y.abs_diff(goal.y) {
        [x_step, y_step]
    } else {
        [y_step, x_step]
    };

    steps
        .into_iter()
        .flatten()
        .filter_map(|(dx, dy)| map.step(from, dx, dy))
        .filter(|&cell| map.is_passable(cell))
        .collect()
}
