use std::cmp::Ordering;

use super::{Cell, TimeCell};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LowLevelNode {
    pub(crate) position: Cell,
    pub(crate) f_cost: usize,
    pub(crate) g_cost: usize, // elapsed time, every move or wait costs one step
    pub(crate) sequence: usize,
    pub(crate) parent: Option<TimeCell>,
}

impl LowLevelNode {
    pub(crate) fn state(&self) -> TimeCell {
        TimeCell::new(self.position, self.g_cost)
    }
}

// Lower f first; equal f in insertion order.
impl Ord for LowLevelNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_cost
            .cmp(&other.f_cost)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for LowLevelNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
