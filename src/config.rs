use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;

use crate::algorithm::Algorithm;
use crate::common::PriorityStrategy;
use crate::resolver::ResolutionStrategy;

#[derive(Parser, Debug, Default)]
#[command(
    name = "mapf_morph",
    about = "Multi-agent path planning on grids with constraint-tree search.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, help = "Path to the YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the solve request (YAML or JSON)")]
    pub request_path: Option<String>,

    #[arg(long, help = "Path to the JSON solution output")]
    pub output_path: Option<String>,

    #[arg(long, value_enum, help = "Single-agent search")]
    pub algorithm: Option<Algorithm>,

    #[arg(long, help = "Restrict moves to the morphic set")]
    pub morphing: Option<bool>,

    #[arg(long, value_enum, help = "Which colliding agent yields")]
    pub conflict_resolution: Option<ResolutionStrategy>,

    #[arg(long, help = "Allow 8-connected moves")]
    pub allow_diagonals: Option<bool>,

    #[arg(long, value_enum, help = "How agent priorities are computed")]
    pub priority_strategy: Option<PriorityStrategy>,

    #[arg(long, help = "Hard ceiling on the planning horizon")]
    pub max_horizon: Option<usize>,

    #[arg(long, help = "Maximum number of fallback restarts")]
    pub max_restarts: Option<usize>,

    #[arg(long, help = "Maximum number of constraint tree expansions")]
    pub max_high_level_expansions: Option<usize>,

    #[arg(long, help = "Wall-clock budget for one solve, in milliseconds")]
    pub time_limit_ms: Option<u64>,

    #[arg(long, help = "Seed for the random scenario generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Width of a random scenario")]
    pub width: Option<usize>,

    #[arg(long, help = "Height of a random scenario")]
    pub height: Option<usize>,

    #[arg(long, help = "Number of agents in a random scenario")]
    pub num_agents: Option<usize>,

    #[arg(long, help = "Obstacle probability per cell in a random scenario")]
    pub obstacle_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub request_path: Option<String>,
    pub output_path: String,

    pub algorithm: Algorithm,
    pub morphing: bool,
    pub conflict_resolution: ResolutionStrategy,
    pub allow_diagonals: bool,
    pub priority_strategy: PriorityStrategy,

    pub max_horizon: usize,
    pub max_restarts: usize,
    pub max_high_level_expansions: usize,
    pub time_limit_ms: Option<u64>,

    pub seed: u64,
    pub width: usize,
    pub height: usize,
    pub num_agents: usize,
    pub obstacle_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_path: None,
            output_path: "result/solution.json".to_string(),
            algorithm: Algorithm::default(),
            morphing: false,
            conflict_resolution: ResolutionStrategy::default(),
            allow_diagonals: false,
            priority_strategy: PriorityStrategy::default(),
            max_horizon: 200,
            max_restarts: 256,
            max_high_level_expansions: 100_000,
            time_limit_ms: None,
            seed: 0,
            width: 10,
            height: 10,
            num_agents: 10,
            obstacle_ratio: 0.1,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid config")
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(request_path) = &cli.request_path {
            self.request_path = Some(request_path.clone());
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = output_path.clone();
        }
        if let Some(algorithm) = cli.algorithm {
            self.algorithm = algorithm;
        }
        if let Some(morphing) = cli.morphing {
            self.morphing = morphing;
        }
        if let Some(conflict_resolution) = cli.conflict_resolution {
            self.conflict_resolution = conflict_resolution;
        }
        if let Some(allow_diagonals) = cli.allow_diagonals {
            self.allow_diagonals = allow_diagonals;
        }
        if let Some(priority_strategy) = cli.priority_strategy {
            self.priority_strategy = priority_strategy;
        }
        if let Some(max_horizon) = cli.max_horizon {
            self.max_horizon = max_horizon;
        }
        if let Some(max_restarts) = cli.max_restarts {
            self.max_restarts = max_restarts;
        }
        if let Some(max_high_level_expansions) = cli.max_high_level_expansions {
            self.max_high_level_expansions = max_high_level_expansions;
        }
        if let Some(time_limit_ms) = cli.time_limit_ms {
            self.time_limit_ms = Some(time_limit_ms);
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(width) = cli.width {
            self.width = width;
        }
        if let Some(height) = cli.height {
            self.height = height;
        }
        if let Some(num_agents) = cli.num_agents {
            self.num_agents = num_agents;
        }
        if let Some(obstacle_ratio) = cli.obstacle_ratio {
            self.obstacle_ratio = obstacle_ratio;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_horizon == 0 {
            bail!("max_horizon must be positive");
        }
        if !(0.0..1.0).contains(&self.obstacle_ratio) {
            bail!(
                "obstacle_ratio must be in [0, 1), got {}",
                self.obstacle_ratio
            );
        }
        if self.request_path.is_none() {
            if self.width == 0 || self.height == 0 {
                bail!(
                    "random scenario needs a non-empty grid, got {}x{}",
                    self.width,
                    self.height
                );
            }
            if self.num_agents == 0 {
                bail!("random scenario needs at least one agent");
            }
        }
        Ok(())
    }
}
