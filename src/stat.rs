use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub costs: usize,
    pub horizon: usize,
    pub restarts: usize,
    pub time_us: usize,
    pub low_level_expand_nodes: usize,
    pub high_level_expand_nodes: usize,
}

impl Stats {
    pub(crate) fn print(&self) {
        info!(
            "Cost {:?} Horizon {:?} Restarts {:?} Time(microseconds) {:?} High level expand nodes number: {:?} Low level expand nodes number {:?}",
            self.costs,
            self.horizon,
            self.restarts,
            self.time_us,
            self.high_level_expand_nodes,
            self.low_level_expand_nodes
        );
    }
}
