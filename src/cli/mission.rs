//! Mission directory commands.

use std::path::PathBuf;

use clap::Subcommand;

use crate::config::Config;
use crate::directory;

use super::format::format_mission;

#[derive(Debug, Subcommand)]
pub enum MissionCommand {
    /// List the missions in the directory.
    List {
        /// Filter by country code (e.g. `FR`).
        #[arg(long)]
        country: Option<String>,

        /// Mission directory file. Defaults to the configured path,
        /// then `~/.guichet/missions.toml`.
        #[arg(long)]
        directory: Option<PathBuf>,
    },
}

pub(super) fn run(command: MissionCommand, config: &Config) -> Result<(), String> {
    match command {
        MissionCommand::List { country, directory } => {
            cmd_list(country.as_deref(), directory, config)
        }
    }
}

fn cmd_list(
    country: Option<&str>,
    directory: Option<PathBuf>,
    config: &Config,
) -> Result<(), String> {
    let path = directory_path(directory, config)?;
    let missions = directory::load(&path)?;

    let mut shown = 0;
    for mission in &missions {
        if let Some(country) = country
            && mission.country_code != country
        {
            continue;
        }
        println!("{}  {}", mission.id, format_mission(mission));
        shown += 1;
    }
    if shown == 0 {
        println!("No missions");
    }
    Ok(())
}

/// Resolves the mission directory path: flag, then config, then default.
pub(super) fn directory_path(
    flag: Option<PathBuf>,
    config: &Config,
) -> Result<PathBuf, String> {
    flag.or_else(|| config.missions_path.clone())
        .or_else(directory::default_path)
        .ok_or_else(|| "could not determine home directory".to_string())
}
