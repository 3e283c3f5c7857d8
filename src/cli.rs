//! CLI interface for guichet.
//!
//! Non-interactive subcommands for citizens at the desk and the agents
//! behind it: arguments in, structured output out. Machine-readable results
//! go to stdout, human commentary to stderr.
//!
//! Request ids accept a full UUID or an unambiguous prefix (e.g. `a3b`).

mod format;
mod locate;
mod mission;
mod request;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::storage::{RefDataFile, Storage};

/// guichet — the consular services desk.
#[derive(Debug, Parser)]
#[command(name = "guichet", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: a passport renewal
  1. guichet request new passport-renewal --organization org-marseille --profile prof-17
     → prints the request id (any unambiguous prefix works afterwards)
  2. guichet request submit a3b
  3. guichet request assign a3b --agent agent-dupont
  4. guichet request status a3b validated --by agent-dupont
  5. guichet request complete a3b --by agent-dupont

Find the mission responsible for you:
  guichet locate --longitude 2.35 --latitude 48.86";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage service requests through their lifecycle.
    Request {
        #[command(subcommand)]
        command: request::RequestCommand,
    },

    /// Browse the diplomatic-mission directory.
    Mission {
        #[command(subcommand)]
        command: mission::MissionCommand,
    },

    /// Resolve which mission has jurisdiction over your position.
    Locate(locate::LocateArgs),

    /// Load reference data used for display enrichment.
    Refdata {
        #[command(subcommand)]
        command: RefdataCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum RefdataCommand {
    /// Import services, organizations and profiles from a TOML seed file.
    Load { path: PathBuf },
}

/// Dispatches a parsed command line.
pub fn run(cli: Cli, storage: &Storage, config: &Config) -> Result<(), String> {
    match cli.command {
        Command::Request { command } => request::run(command, storage, config),
        Command::Mission { command } => mission::run(command, config),
        Command::Locate(args) => locate::run(args, config),
        Command::Refdata {
            command: RefdataCommand::Load { path },
        } => {
            let refdata = RefDataFile::load(&path)?;
            let count = storage
                .import_refdata(&refdata)
                .map_err(|e| format!("failed to import reference data: {e}"))?;
            eprintln!("Imported {count} records");
            Ok(())
        }
    }
}
