//! Command dispatching.
//!
//! Routes each CLI subcommand to one store operation. The dispatcher owns
//! the composition root: the extension catalog, store configuration, and
//! the registry of live stores are built here and injected downward.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;

use crate::cli::args::{Cli, Commands};
use crate::error::{Result, StagehandError};
use crate::extension::DirectoryCatalog;
use crate::model::{Sequence, Step, StepStatus};
use crate::store::{StoreConfig, StoreRegistry};

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self { exit_code: 0 }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

/// Dispatches CLI commands to store operations.
pub struct CommandDispatcher {
    registry: StoreRegistry,
}

impl CommandDispatcher {
    /// Build the dispatcher for a stagehand home directory.
    pub fn new(home: &Path) -> Self {
        let config = StoreConfig {
            log_dir: home.join("logs"),
            scripts_dir: home.join("scripts"),
            shared_log_path: home.join("logs").join("stagehand.log"),
            scratch_dir: std::env::temp_dir(),
        };
        let catalog = Arc::new(DirectoryCatalog::new(home.join("extensions")));
        let registry = StoreRegistry::new(home.join("steps.yml"), config, catalog);
        Self { registry }
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli) -> Result<CommandResult> {
        let unit = cli.unit.as_deref();

        match &cli.command {
            Commands::List(args) => {
                let filter = match &args.status {
                    Some(s) => Some(StepStatus::parse(s).ok_or_else(|| {
                        StagehandError::Validation {
                            message: format!("invalid status '{}'", s),
                        }
                    })?),
                    None => None,
                };
                let sequence = self.registry.store_for(unit)?.get_all(filter)?;
                if args.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&sequence).map_err(anyhow::Error::from)?
                    );
                } else {
                    print_sequence(&sequence);
                }
                Ok(CommandResult::success())
            }

            Commands::Get(args) => {
                let step = self.registry.store_for(unit)?.get(&args.name)?;
                if args.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&step).map_err(anyhow::Error::from)?
                    );
                } else {
                    print!("{}", serde_yaml::to_string(&step).map_err(anyhow::Error::from)?);
                }
                Ok(CommandResult::success())
            }

            Commands::Apply(args) => {
                let content = std::fs::read_to_string(&args.file)?;
                let incoming: Sequence =
                    serde_yaml::from_str(&content).map_err(|e| StagehandError::ParseError {
                        path: args.file.clone(),
                        message: e.to_string(),
                    })?;
                self.registry
                    .store_for(unit)?
                    .replace_all(&incoming, args.overwrite)?;
                Ok(CommandResult::success())
            }

            Commands::Insert(args) => {
                let mut step = Step::named(&args.name);
                if let Some(script) = &args.script {
                    step.script = script.clone();
                }
                if let Some(label) = &args.label {
                    step.label = label.clone();
                }
                step.phase = args.phase.clone();
                if let Some(timeout) = args.timeout {
                    step.script_timeout = timeout;
                }
                step.states_to_rerun = args.rerun.clone();

                self.registry.store_for(unit)?.insert_step(
                    step,
                    args.position,
                    args.anchor.as_deref(),
                    args.before,
                )?;
                Ok(CommandResult::success())
            }

            Commands::Delete(args) => {
                self.registry
                    .store_for(unit)?
                    .delete_step(args.position, args.name.as_deref())?;
                Ok(CommandResult::success())
            }

            Commands::SetStatus(args) => {
                self.registry.store_for(unit)?.set_status(
                    &args.name,
                    args.status.as_deref().unwrap_or(""),
                    args.reason.as_deref().unwrap_or(""),
                    args.script.as_deref().unwrap_or(""),
                    args.timeout.unwrap_or(-1),
                    args.recursive,
                )?;
                Ok(CommandResult::success())
            }

            Commands::SetRange(args) => {
                self.registry.store_for(unit)?.set_status_range(
                    &args.status,
                    args.from.as_deref(),
                    !args.from_excluded,
                    args.to.as_deref(),
                    !args.to_excluded,
                )?;
                Ok(CommandResult::success())
            }

            Commands::Run(args) => {
                self.registry.store_for(unit)?.execute(
                    args.from.as_deref().unwrap_or(""),
                    args.to.as_deref().unwrap_or(""),
                )?;
                Ok(CommandResult::success())
            }

            Commands::Reset => {
                self.registry.store_for(unit)?.reset_all()?;
                Ok(CommandResult::success())
            }

            Commands::Log(args) => {
                let data = self.registry.store_for(unit)?.read_log(
                    &args.name,
                    args.position,
                    args.length,
                    args.bytes,
                )?;
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&data)?;
                if !args.bytes && !data.is_empty() {
                    stdout.write_all(b"\n")?;
                }
                Ok(CommandResult::success())
            }

            Commands::Running => {
                let running = self.registry.store_for(unit)?.is_running()?;
                println!("{}", running);
                Ok(if running {
                    CommandResult::success()
                } else {
                    CommandResult::failure(1)
                })
            }

            Commands::Completions(args) => {
                clap_complete::generate(
                    args.shell,
                    &mut Cli::command(),
                    "stagehand",
                    &mut std::io::stdout(),
                );
                Ok(CommandResult::success())
            }
        }
    }
}

fn print_sequence(sequence: &Sequence) {
    for (i, step) in sequence.steps.iter().enumerate() {
        println!(
            "{:>3}  {:<10} {:<28} {}",
            i + 1,
            step.status.to_string(),
            step.name,
            step.label
        );
    }
}
