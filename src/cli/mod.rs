//! CLI module for looper - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands to describe, run, step and
//! pace the configured loop stacks.

pub mod commands;

pub use commands::Cli;
