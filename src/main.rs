use mapf_morph::config::{Cli, Config};
use mapf_morph::scenario::Scenario;
use mapf_morph::solver::{Solver, CBS};

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let scenario = match &config.request_path {
        Some(path) => Scenario::load_from_file(path)?,
        None => {
            info!("No request specified, generating a random scenario");
            let mut rng = StdRng::seed_from_u64(config.seed);
            Scenario::random(
                config.width,
                config.height,
                config.num_agents,
                config.obstacle_ratio,
                &mut rng,
            )?
        }
    };
    let config = scenario.apply_to(&config);
    let map = scenario.build_map()?;
    let agents = scenario.generate_agents(config.priority_strategy)?;

    let mut solver = CBS::new(agents.clone(), &map);
    match solver.solve(&config) {
        Ok(solution) => {
            if !solution.verify(&map, &agents, config.allow_diagonals) {
                write_output(&config.output_path, "{}")?;
                bail!("solver returned an invalid solution");
            }
            let output = serde_json::to_string_pretty(&solution.paths)?;
            write_output(&config.output_path, &output)?;
            info!(
                "solved {} agents with horizon {}, written to {}",
                agents.len(),
                solution.horizon,
                config.output_path
            );
            Ok(())
        }
        Err(err) => {
            error!("solve fails: {err}");
            write_output(&config.output_path, "{}")?;
            Err(err.into())
        }
    }
}

fn write_output(path: &str, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create output directory for {path}"))?;
    }
    fs::write(path, content).with_context(|| format!("cannot write output file: {path}"))
}
