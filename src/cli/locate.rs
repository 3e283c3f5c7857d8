//! Locate: resolve which mission has jurisdiction over the user.
//!
//! Position failures are explanatory, not fatal: the command reports why
//! no position is known and leaves the jurisdiction unresolved.

use std::path::PathBuf;

use clap::Args;

use crate::config::Config;
use crate::jurisdiction;
use crate::model::{GeoPoint, Mission, MissionKind};
use crate::position;

use super::format::{format_mission, mission_kind_label};
use super::mission::directory_path;

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Longitude in degrees.
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Latitude in degrees.
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Mission directory file. Defaults to the configured path,
    /// then `~/.guichet/missions.toml`.
    #[arg(long)]
    directory: Option<PathBuf>,
}

pub(super) fn run(args: LocateArgs, config: &Config) -> Result<(), String> {
    let explicit = match (args.longitude, args.latitude) {
        (Some(longitude), Some(latitude)) => Some(GeoPoint {
            longitude,
            latitude,
        }),
        _ => None,
    };

    let path = directory_path(args.directory, config)?;
    let mut missions = crate::directory::load(&path)?;

    let point = match position::resolve(explicit, config.locate_command.as_deref()) {
        Ok(point) => point,
        Err(e) => {
            eprintln!("{e}");
            println!("Jurisdiction could not be determined.");
            return Ok(());
        }
    };

    jurisdiction::compute_distances(Some(point), &mut missions);
    let resolved = jurisdiction::resolve(&missions);

    let mut ranked: Vec<&Mission> = missions
        .iter()
        .filter(|m| {
            matches!(
                m.kind,
                MissionKind::Embassy | MissionKind::ConsulateGeneral
            )
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal));

    for mission in &ranked {
        println!("{}", format_mission(mission));
    }

    match resolved.effective() {
        Some(mission) => {
            println!(
                "Jurisdiction: {} of {} ({})",
                mission_kind_label(mission.kind),
                mission.city,
                mission.country_code
            );
        }
        None => println!("Jurisdiction could not be determined."),
    }
    Ok(())
}
