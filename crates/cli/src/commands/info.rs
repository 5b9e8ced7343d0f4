//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use contracts::CourierConfig;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    messaging_enabled: bool,
    processors: Vec<ProcessorInfo>,
}

#[derive(Serialize)]
struct ProcessorInfo {
    name: String,
    processor_type: String,
    enabled: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args.params);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args.params);
    }

    Ok(())
}

fn build_config_info(config: &CourierConfig, with_params: bool) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", config.version),
        messaging_enabled: config.messaging.enabled,
        processors: config
            .processors
            .iter()
            .map(|p| ProcessorInfo {
                name: p.name.clone(),
                processor_type: format!("{:?}", p.processor_type).to_lowercase(),
                enabled: p.enabled,
                // Sorted for stable output
                params: if with_params {
                    p.params.clone().into_iter().collect()
                } else {
                    BTreeMap::new()
                },
            })
            .collect(),
    }
}

fn print_config_info(config: &CourierConfig, with_params: bool) {
    let info = build_config_info(config, with_params);

    println!("\n=== Courier Configuration ===\n");
    println!("Version: {}", info.version);
    println!("Messaging enabled: {}", info.messaging_enabled);

    println!("\nProcessors ({}):", info.processors.len());
    for processor in &info.processors {
        let state = if processor.enabled { "enabled" } else { "disabled" };
        println!(
            "  {} [{}] {}",
            processor.name, processor.processor_type, state
        );
        for (key, value) in &processor.params {
            println!("      {} = {}", key, value);
        }
    }

    println!();
}
