//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use contracts::CourierConfig;

use crate::cli::RunArgs;
use crate::pipeline::{Scenario, ScenarioRunner};

/// Execute the `run` command
pub fn run_scenario(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.messaging_disabled {
        info!("Messaging disabled from CLI");
        config.messaging.enabled = false;
    }

    info!(
        processors = config.enabled_processors().count(),
        messaging_enabled = config.messaging.enabled,
        "Configuration loaded"
    );

    let scenario = args
        .scenario
        .as_deref()
        .map(|path| {
            Scenario::load(path)
                .with_context(|| format!("Failed to load scenario from {}", path.display()))
        })
        .transpose()?;

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, scenario.as_ref());
        return Ok(());
    }

    let Some(scenario) = scenario else {
        anyhow::bail!("No scenario given; pass --scenario <file>");
    };

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let mut runner = ScenarioRunner::new(&config).context("Failed to set up dispatcher")?;
    let stats = runner.run(&scenario).context("Scenario execution failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&stats.to_json())
            .context("Failed to serialize run report")?;
        println!("{}", json);
    } else {
        stats.print_summary();
    }

    info!("Courier finished");
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &CourierConfig, scenario: Option<&Scenario>) {
    println!("\n=== Configuration Summary ===\n");
    println!(
        "Messaging: {}",
        if config.messaging.enabled { "enabled" } else { "disabled" }
    );

    println!("\nProcessors ({}):", config.processors.len());
    for processor in &config.processors {
        let state = if processor.enabled { "" } else { " [disabled]" };
        println!(
            "  - {} ({:?}){}",
            processor.name, processor.processor_type, state
        );
    }

    if let Some(scenario) = scenario {
        println!(
            "\nScenario: {} ({} steps, {} sends)",
            scenario.name.as_deref().unwrap_or("unnamed"),
            scenario.steps.len(),
            scenario.send_count()
        );
    }

    println!();
}
