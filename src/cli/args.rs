//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Stagehand - scriptable installation workflow engine.
#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Home directory holding the sequence file, extension catalog,
    /// scripts, and logs
    #[arg(long, global = true, env = "STAGEHAND_HOME", default_value = "/usr/local/stagehand")]
    pub home: PathBuf,

    /// Operate on a registered extension's sequence instead of the main one
    #[arg(short, long, global = true)]
    pub unit: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the sequence's steps
    List(ListArgs),

    /// Show one step
    Get(GetArgs),

    /// Apply a new sequence document, merging with or overwriting the
    /// current one
    Apply(ApplyArgs),

    /// Insert a step at a position or next to an anchor step
    Insert(InsertArgs),

    /// Delete a step by position or name
    Delete(DeleteArgs),

    /// Set one step's status, script, or timeout
    SetStatus(SetStatusArgs),

    /// Set the status of a range of steps
    SetRange(SetRangeArgs),

    /// Execute the sequence, or a window of it
    Run(RunArgs),

    /// Reset every step back to READY
    Reset,

    /// Read a slice of a step's log
    Log(LogArgs),

    /// Report whether any step is running
    Running,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Only show steps with this status
    #[arg(short, long)]
    pub status: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `get` command.
#[derive(Debug, Clone, clap::Args)]
pub struct GetArgs {
    /// Step name
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `apply` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ApplyArgs {
    /// Path to the sequence document to apply
    pub file: PathBuf,

    /// Replace the current sequence instead of merging with it
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments for the `insert` command.
#[derive(Debug, Clone, clap::Args)]
pub struct InsertArgs {
    /// Name of the step; must be a registered extension
    pub name: String,

    /// 1-based position to insert at
    #[arg(short, long)]
    pub position: Option<usize>,

    /// Insert next to this step instead of at a numeric position
    #[arg(short, long)]
    pub anchor: Option<String>,

    /// Insert ahead of the resolved slot instead of after it
    #[arg(long)]
    pub before: bool,

    /// Shell command line for the step (defaults to the generated
    /// invocation)
    #[arg(long)]
    pub script: Option<String>,

    /// Display name
    #[arg(long)]
    pub label: Option<String>,

    /// Phase tag
    #[arg(long)]
    pub phase: Option<String>,

    /// Script timeout in minutes (0 disables the timeout)
    #[arg(long)]
    pub timeout: Option<i64>,

    /// Steps to force back to READY whenever this step runs
    #[arg(long, value_delimiter = ',')]
    pub rerun: Vec<String>,
}

/// Arguments for the `delete` command.
#[derive(Debug, Clone, clap::Args)]
pub struct DeleteArgs {
    /// 1-based position of the step to delete
    #[arg(short, long)]
    pub position: Option<usize>,

    /// Name of the step to delete
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the `set-status` command.
#[derive(Debug, Clone, clap::Args)]
pub struct SetStatusArgs {
    /// Step name
    pub name: String,

    /// New status (READY, RUNNING, SUCCEEDED, FAILED, SKIP)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Failure reason (kept only with FAILED)
    #[arg(long)]
    pub reason: Option<String>,

    /// Overwrite the step's script
    #[arg(long)]
    pub script: Option<String>,

    /// Overwrite the step's timeout in minutes
    #[arg(long)]
    pub timeout: Option<i64>,

    /// With READY, also reset the step's own nested sequence when it
    /// names a registered extension
    #[arg(short, long)]
    pub recursive: bool,
}

/// Arguments for the `set-range` command.
#[derive(Debug, Clone, clap::Args)]
pub struct SetRangeArgs {
    /// New status for every step in the range
    #[arg(short, long)]
    pub status: String,

    /// First step of the range (defaults to the start of the sequence)
    #[arg(long)]
    pub from: Option<String>,

    /// Exclude the `from` step itself
    #[arg(long)]
    pub from_excluded: bool,

    /// Last step of the range (defaults to the end of the sequence)
    #[arg(long)]
    pub to: Option<String>,

    /// Exclude the `to` step itself
    #[arg(long)]
    pub to_excluded: bool,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// First step to execute (defaults to the start of the sequence)
    #[arg(long)]
    pub from: Option<String>,

    /// Last step to execute, inclusive (defaults to the end)
    #[arg(long)]
    pub to: Option<String>,
}

/// Arguments for the `log` command.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Step name, or a virtual source ("mock", "pcm")
    pub name: String,

    /// 1-based line number, or byte offset with --bytes
    #[arg(short, long, default_value_t = 1)]
    pub position: usize,

    /// How many lines (or bytes) to read
    #[arg(short, long, default_value_t = 200)]
    pub length: usize,

    /// Slice by byte offset instead of line number
    #[arg(long)]
    pub bytes: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
