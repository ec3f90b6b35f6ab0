//! Command-line interface for Stagehand.
//!
//! This module provides the CLI argument parsing using clap's derive macros
//! and the dispatcher routing each subcommand to a store operation.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Dispatcher and command execution

pub mod args;
pub mod commands;

pub use args::{
    ApplyArgs, Cli, Commands, DeleteArgs, GetArgs, InsertArgs, ListArgs, LogArgs, RunArgs,
    SetRangeArgs, SetStatusArgs,
};
pub use commands::{CommandDispatcher, CommandResult};
