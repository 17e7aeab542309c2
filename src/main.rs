use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

mod cli;
mod config;
mod harness;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use harness::PaceOptions;

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("looper")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("looper.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_doc_command(false, config),
        Some(Commands::Doc { json }) => handle_doc_command(*json, config),
        Some(Commands::Run { mode }) => handle_run_command(mode, config),
        Some(Commands::Step {
            mode,
            level,
            count,
            times,
        }) => handle_step_command(mode, level, *count, *times, config),
        Some(Commands::Pace {
            mode,
            grain,
            steps,
            pauses,
            delay_ms,
        }) => {
            let opts = PaceOptions {
                mode: mode.clone(),
                grain: grain.clone(),
                steps: *steps,
                pauses: *pauses,
                delay: Duration::from_millis(*delay_ms),
            };
            handle_pace_command(&opts, config)
        }
    }
}

fn handle_doc_command(json: bool, config: &Config) -> Result<()> {
    info!("Describing {} stacks", config.stacks.len());
    print!("{}", harness::doc(config, json)?);
    if json {
        println!();
    }
    Ok(())
}

fn handle_run_command(mode: &str, config: &Config) -> Result<()> {
    let levels = config.stack(mode).map_or(0, |st| st.levels.len());
    info!("Running mode: {} ({} levels)", mode, levels);
    println!("{} {}", "Running:".cyan(), mode);
    let outcome = harness::run(config, mode, true)?;
    println!("{} {}", "Done:".green(), outcome);
    Ok(())
}

fn handle_step_command(mode: &str, level: &str, count: i64, times: u32, config: &Config) -> Result<()> {
    info!("Stepping mode: {} at {} x{} ({} times)", mode, level, count, times);
    println!("{} {} at {}", "Stepping:".cyan(), mode, level);
    let outcomes = harness::step(config, mode, level, count, times, true)?;
    if let Some(last) = outcomes.last() {
        println!("{} {} after {} steps", "Done:".green(), last, outcomes.len());
    }
    Ok(())
}

fn handle_pace_command(opts: &PaceOptions, config: &Config) -> Result<()> {
    info!("Pacing mode: {} at {} every {} steps", opts.mode, opts.grain, opts.steps);
    println!("{} {} at {}", "Pacing:".cyan(), opts.mode, opts.grain);
    let report = harness::pace(config, opts, true)?;
    println!("{} {} after {} pauses", "Done:".green(), report.outcome, report.pauses);
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = if cli.is_verbose() {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    setup_logging(level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
