//! Mission directory: the static set of diplomatic missions.
//!
//! Loaded once per process from a TOML file and immutable thereafter:
//!
//! ```text
//! [[mission]]
//! id = "cg-marseille"
//! kind = "consulate-general"
//! country = "FR"
//! city = "Marseille"
//! longitude = 5.3698
//! latitude = 43.2965
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::{GeoPoint, Mission, MissionKind};

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default, rename = "mission")]
    missions: Vec<MissionEntry>,
}

#[derive(Debug, Deserialize)]
struct MissionEntry {
    id: String,
    kind: MissionKind,
    country: String,
    city: String,
    longitude: f64,
    latitude: f64,
}

/// The default directory path: `~/.guichet/missions.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".guichet").join("missions.toml"))
}

/// Loads the mission directory from a TOML file.
///
/// Unknown mission kinds and duplicate ids are load errors, not skips:
/// a directory that lies about itself should not half-load.
pub fn load(path: &Path) -> Result<Vec<Mission>, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read mission directory {}: {e}", path.display()))?;

    let file: DirectoryFile = toml::from_str(&contents)
        .map_err(|e| format!("invalid mission directory {}: {e}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    let mut missions = Vec::with_capacity(file.missions.len());
    for entry in file.missions {
        if !seen.insert(entry.id.clone()) {
            return Err(format!(
                "duplicate mission id {:?} in {}",
                entry.id,
                path.display()
            ));
        }
        missions.push(Mission {
            id: entry.id,
            kind: entry.kind,
            country_code: entry.country,
            city: entry.city,
            location: GeoPoint {
                longitude: entry.longitude,
                latitude: entry.latitude,
            },
            distance_km: None,
        });
    }
    Ok(missions)
}
