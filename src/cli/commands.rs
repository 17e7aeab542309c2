//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - doc: describe the configured stacks
//! - run: run a mode to completion
//! - step: step a mode at one level
//! - pace: run a mode on a worker thread, pausing at a level

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Looper - nested loop scheduler for iterative simulations
#[derive(Parser, Debug)]
#[command(name = "looper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Describe the configured stacks, their levels and callbacks
    Doc {
        /// Print a JSON summary instead of the indented listing
        #[arg(long)]
        json: bool,
    },

    /// Run a mode to completion
    Run {
        /// Mode to run (e.g. train, test)
        #[arg(short, long)]
        mode: String,
    },

    /// Step a mode a number of iterations at one level
    Step {
        /// Mode to step
        #[arg(short, long)]
        mode: String,

        /// Level to count iterations at
        #[arg(short, long)]
        level: String,

        /// Iterations per step; zero uses the level's default
        #[arg(short = 'n', long, default_value_t = 1)]
        count: i64,

        /// Number of steps to take
        #[arg(short, long, default_value_t = 1)]
        times: u32,
    },

    /// Run a mode on a worker thread, pausing at the end of a level's iterations
    Pace {
        /// Mode to run
        #[arg(short, long)]
        mode: String,

        /// Level whose iterations count as steps
        #[arg(short, long)]
        grain: String,

        /// Iterations between pauses
        #[arg(short, long, default_value_t = 1)]
        steps: i64,

        /// Pauses to wait for before stopping the run
        #[arg(short, long, default_value_t = 3)]
        pauses: usize,

        /// Time to stay paused before resuming
        #[arg(short, long, default_value_t = 0)]
        delay_ms: u64,
    },
}
