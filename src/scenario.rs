use anyhow::{bail, Context, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::algorithm::Algorithm;
use crate::assignment::assign;
use crate::common::{Agent, Cell, PriorityStrategy};
use crate::config::Config;
use crate::map::Map;
use crate::resolver::ResolutionStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: usize,
    pub start: [usize; 2],
    pub goal: [usize; 2],
}

/// A solve request: the grid, who moves where, and optional per-request
/// overrides of the solver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// 0/1 matrix indexed `grid[y][x]`, 1 marks an obstacle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Vec<Vec<u8>>>,
    /// MovingAI `.map` file, used when `grid` is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_path: Option<String>,

    /// Explicit start/goal pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<Route>>,
    /// Unpaired positions, matched by minimum total distance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origins: Option<Vec<[usize; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<[usize; 2]>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morphing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_resolution_strategy: Option<ResolutionStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_diagonals: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_strategy: Option<PriorityStrategy>,
}

impl Scenario {
    /// Reads a request from JSON (`.json`) or YAML (anything else).
    pub fn load_from_file(path: &str) -> Result<Scenario> {
        let content =
            fs::read_to_string(path).with_context(|| format!("cannot read request {path}"))?;
        let is_json = Path::new(path)
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

        let scenario = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON request {path}"))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML request {path}"))?
        };
        Ok(scenario)
    }

    pub fn write_to_yaml(&self, path: &str) -> Result<()> {
        let yaml_data = serde_yaml::to_string(self)?;
        fs::write(path, yaml_data).with_context(|| format!("cannot write scenario {path}"))?;
        Ok(())
    }

    /// Random open-field instance: each cell is blocked with probability
    /// `obstacle_ratio`, origins and destinations are distinct free cells.
    pub fn random<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        num_agents: usize,
        obstacle_ratio: f64,
        rng: &mut R,
    ) -> Result<Scenario> {
        let grid: Vec<Vec<u8>> = (0..height)
            .map(|_| {
                (0..width)
                    .map(|_| u8::from(rng.gen_bool(obstacle_ratio)))
                    .collect()
            })
            .collect();

        let free: Vec<[usize; 2]> = grid
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &value)| value == 0)
                    .map(move |(x, _)| [x, y])
            })
            .collect();
        if free.len() < num_agents {
            bail!(
                "only {} free cells for {num_agents} agents on a {width}x{height} grid",
                free.len()
            );
        }

        let origins: Vec<[usize; 2]> = free.choose_multiple(rng, num_agents).copied().collect();
        let destinations: Vec<[usize; 2]> =
            free.choose_multiple(rng, num_agents).copied().collect();
        info!("Generate scen: origins {origins:?} destinations {destinations:?}");

        Ok(Scenario {
            grid: Some(grid),
            origins: Some(origins),
            destinations: Some(destinations),
            ..Scenario::default()
        })
    }

    pub fn build_map(&self) -> Result<Map> {
        match (&self.grid, &self.map_path) {
            (Some(grid), None) => Map::from_matrix(grid),
            (None, Some(path)) => Map::from_file(path),
            (Some(_), Some(_)) => bail!("request sets both grid and mapPath"),
            (None, None) => bail!("request has neither grid nor mapPath"),
        }
    }

    /// Explicit agents keep their ids; origins and destinations go through
    /// the assignment first.
    pub fn generate_agents(&self, strategy: PriorityStrategy) -> Result<Vec<Agent>> {
        let agents = match (&self.agents, &self.origins, &self.destinations) {
            (Some(routes), None, None) => routes
                .iter()
                .map(|route| {
                    Agent::new(
                        route.id,
                        Cell::from(route.start),
                        Cell::from(route.goal),
                        strategy,
                    )
                })
                .collect(),
            (None, Some(origins), Some(destinations)) => {
                let origins: Vec<Cell> = origins.iter().copied().map(Cell::from).collect();
                let destinations: Vec<Cell> =
                    destinations.iter().copied().map(Cell::from).collect();
                assign(&origins, &destinations, strategy)?
            }
            (None, None, None) => bail!("request has no agents"),
            _ => bail!("request must set either agents or both origins and destinations"),
        };
        Ok(agents)
    }

    /// Request-level options override the configuration.
    pub fn apply_to(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(morphing) = self.morphing {
            config.morphing = morphing;
        }
        if let Some(strategy) = self.conflict_resolution_strategy {
            config.conflict_resolution = strategy;
        }
        if let Some(allow_diagonals) = self.allow_diagonals {
            config.allow_diagonals = allow_diagonals;
        }
        if let Some(priority_strategy) = self.priority_strategy {
            config.priority_strategy = priority_strategy;
        }
        config
    }
}
