use super::fallback::Fallback;
use super::Solver;
use crate::common::{Agent, HighLevelNode, Path, Solution, TimeCell};
use crate::config::Config;
use crate::error::SolveError;
use crate::map::Map;
use crate::reservation::ReservationTable;
use crate::stat::Stats;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct CBS {
    agents: Vec<Agent>,
    map: Map,
    stats: Stats,
}

/// Seeding failed for `agent`; `table` is the reservation state it failed
/// against.
struct Stuck<'a> {
    agent: Agent,
    table: ReservationTable<'a>,
}

impl CBS {
    pub fn new(agents: Vec<Agent>, map: &Map) -> Self {
        CBS {
            agents,
            map: map.clone(),
            stats: Stats::default(),
        }
    }

    /// Statistics of the most recent solve.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn validate(&self) -> Result<(), SolveError> {
        if self.agents.is_empty() {
            return Err(SolveError::InvalidRequest("no agents to plan".to_string()));
        }

        let mut ids = HashSet::new();
        let mut starts = HashSet::new();
        let mut goals = HashSet::new();
        for agent in &self.agents {
            if !self.map.is_passable(agent.start) {
                return Err(SolveError::InvalidRequest(format!(
                    "agent {} starts on a blocked or out-of-bounds cell {:?}",
                    agent.id, agent.start
                )));
            }
            if !self.map.is_passable(agent.goal) {
                return Err(SolveError::InvalidRequest(format!(
                    "agent {} targets a blocked or out-of-bounds cell {:?}",
                    agent.id, agent.goal
                )));
            }
            if !ids.insert(agent.id) {
                return Err(SolveError::InvalidRequest(format!(
                    "duplicate agent id {}",
                    agent.id
                )));
            }
            if !starts.insert(agent.start) {
                return Err(SolveError::InvalidRequest(format!(
                    "agents share the start {:?}",
                    agent.start
                )));
            }
            if !goals.insert(agent.goal) {
                return Err(SolveError::InvalidRequest(format!(
                    "agents share the goal {:?}",
                    agent.goal
                )));
            }
        }
        Ok(())
    }
}

impl Solver for CBS {
    fn solve(&mut self, config: &Config) -> Result<Solution, SolveError> {
        let total_solve_start_time = Instant::now();
        self.stats = Stats::default();
        self.validate()?;

        let agents: BTreeMap<usize, Agent> = self
            .agents
            .iter()
            .map(|agent| (agent.id, agent.clone()))
            .collect();
        let base_horizon = agents
            .values()
            .map(|agent| agent.start.distance(&agent.goal, config.allow_diagonals))
            .max()
            .unwrap_or(0);

        let map = &self.map;
        let stats = &mut self.stats;
        let mut fallback = Fallback::new();

        let result = loop {
            let horizon = base_horizon + fallback.extension();
            if horizon > config.max_horizon {
                break Err(SolveError::HorizonExceeded {
                    horizon,
                    limit: config.max_horizon,
                });
            }
            if let Err(err) = check_time_limit(total_solve_start_time, config) {
                break Err(err);
            }
            stats.horizon = horizon;

            match seed(map, &agents, &fallback, horizon, config, stats) {
                Ok(paths) => {
                    break search(
                        map,
                        &agents,
                        paths,
                        &fallback,
                        horizon,
                        config,
                        stats,
                        total_solve_start_time,
                    )
                }
                Err(stuck) => {
                    if stats.restarts >= config.max_restarts {
                        break Err(SolveError::RestartLimit {
                            restarts: stats.restarts,
                        });
                    }
                    info!(
                        "agent {} has no path within horizon {horizon}, restarting with fallback",
                        stuck.agent.id
                    );
                    fallback.relieve(&stuck.agent, &stuck.table, map);
                    stats.restarts += 1;
                }
            }
        };

        stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
        match &result {
            Ok(solution) => {
                stats.costs = solution.paths.values().map(Vec::len).sum();
                stats.print();
            }
            Err(err) => warn!("solve failed: {err}"),
        }
        result
    }
}

/// Plans every agent once against a shared table, in ascending (priority,
/// id) order, reserving each path before planning the next agent.
fn seed<'a>(
    map: &'a Map,
    agents: &BTreeMap<usize, Agent>,
    fallback: &Fallback,
    horizon: usize,
    config: &Config,
    stats: &mut Stats,
) -> Result<BTreeMap<usize, Path>, Stuck<'a>> {
    let mut table = ReservationTable::new(map, config.morphing);
    for (&key, &agent_id) in fallback.reservations() {
        table.reserve(key, agent_id);
    }
    for agent in agents.values() {
        table.reserve(TimeCell::new(agent.start, 0), agent.id);
    }

    let mut order: Vec<&Agent> = agents.values().collect();
    order.sort_by_key(|agent| (agent.priority, agent.id));

    let mut paths = BTreeMap::new();
    for agent in order {
        let path = config.algorithm.find_path(
            map,
            agent,
            &table,
            horizon,
            config.allow_diagonals,
            stats,
        );
        let Some(path) = path else {
            return Err(Stuck {
                agent: agent.clone(),
                table,
            });
        };
        table.reserve_path(&path, agent.id);
        paths.insert(agent.id, path);
    }
    debug!("seeded {} agents at horizon {horizon}", paths.len());
    Ok(paths)
}

/// Best-first search over the constraint tree rooted at `root`. Each
/// expansion replans only the conflict's loser, so a node has at most one
/// child.
#[allow(clippy::too_many_arguments)]
fn search(
    map: &Map,
    agents: &BTreeMap<usize, Agent>,
    root: BTreeMap<usize, Path>,
    fallback: &Fallback,
    horizon: usize,
    config: &Config,
    stats: &mut Stats,
    started: Instant,
) -> Result<Solution, SolveError> {
    let mut open = BTreeSet::new();
    let mut next_node_id = 0;
    open.insert(HighLevelNode::new(next_node_id, root));
    next_node_id += 1;

    while let Some(current_node) = open.pop_first() {
        let Some(conflict) = current_node.detect_conflict(agents, map, config) else {
            return Ok(Solution {
                horizon,
                paths: current_node.paths,
            });
        };
        debug!("conflict: {conflict:?}");

        if stats.high_level_expand_nodes >= config.max_high_level_expansions {
            return Err(SolveError::BudgetExhausted {
                expansions: stats.high_level_expand_nodes,
            });
        }
        check_time_limit(started, config)?;
        stats.high_level_expand_nodes += 1;

        if let Some(child) = current_node.update_constraint(
            &conflict,
            agents,
            map,
            fallback.reservations(),
            horizon,
            next_node_id,
            config,
            stats,
        ) {
            open.insert(child);
            next_node_id += 1;
        }
    }

    Err(SolveError::FrontierExhausted)
}

fn check_time_limit(started: Instant, config: &Config) -> Result<(), SolveError> {
    match config.time_limit_ms {
        Some(limit) if started.elapsed().as_millis() >= u128::from(limit) => {
            Err(SolveError::TimeLimit {
                elapsed_ms: started.elapsed().as_millis(),
            })
        }
        _ => Ok(()),
    }
}
