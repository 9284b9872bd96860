use crate::config::Config;
use crate::node::ForwardingPolicy;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    // Open the configuration file
    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    // Parse the YAML content
    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    // Validate the configuration
    config.validate()?;

    info!(
        "Loaded {} nodes, batch of {} packets from {} to {}",
        config.network.nodes.len(),
        config.batch.size,
        config.batch.source,
        config.batch.destination
    );

    Ok(config)
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub seed: Option<u64>,
    pub policy: Option<ForwardingPolicy>,
    pub runs: Option<u32>,
    pub max_rounds: Option<u32>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(seed) = overrides.seed {
        info!("Overriding seed: {} -> {}", config.general.seed, seed);
        config.general.seed = seed;
    }

    if let Some(policy) = overrides.policy {
        info!("Overriding forwarding policy: {} -> {}", config.general.policy, policy);
        config.general.policy = policy;
    }

    if let Some(runs) = overrides.runs {
        info!("Overriding run count: {} -> {}", config.general.runs, runs);
        config.general.runs = runs;
    }

    if let Some(max_rounds) = overrides.max_rounds {
        info!("Overriding round bound: {} -> {}", config.general.max_rounds, max_rounds);
        config.general.max_rounds = max_rounds;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
