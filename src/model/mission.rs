//! Diplomatic missions: the markers jurisdiction is resolved against.

use serde::{Deserialize, Serialize};

/// A geographic point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// The kind of diplomatic representation.
///
/// Only embassies and consulates general carry consular jurisdiction;
/// the other kinds appear in the directory for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionKind {
    Embassy,
    ConsulateGeneral,
    Consulate,
    HonoraryConsulate,
}

/// A diplomatic mission with a location used for proximity queries.
///
/// Constructed once from the static directory at load time; only
/// `distance_km` changes afterwards, and only as a whole-set recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub kind: MissionKind,
    pub country_code: String,
    pub city: String,
    pub location: GeoPoint,

    /// Great-circle distance from the user, in kilometers.
    /// `None` until distances are computed for a known position.
    #[serde(default)]
    pub distance_km: Option<f64>,
}
