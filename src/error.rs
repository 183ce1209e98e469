/// Failures that end a solve. Agents that cannot be planned during seeding and
/// constraint-tree branches that cannot be replanned are recovered inside the
/// solver (fallback restart and branch pruning) and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("horizon {horizon} exceeds the limit of {limit} steps")]
    HorizonExceeded { horizon: usize, limit: usize },

    #[error("constraint tree exhausted without a conflict-free assignment")]
    FrontierExhausted,

    #[error("gave up after {restarts} fallback restarts")]
    RestartLimit { restarts: usize },

    #[error("gave up after {expansions} constraint tree expansions")]
    BudgetExhausted { expansions: usize },

    #[error("time limit reached after {elapsed_ms} ms")]
    TimeLimit { elapsed_ms: u128 },
}
