//! Jurisdiction resolution: which mission is responsible for a user.
//!
//! Distances are great-circle (haversine) kilometers. A consulate general's
//! consular jurisdiction supersedes the embassy's when both exist in reach —
//! an embassy cedes routine consular work to a consulate general.

use crate::model::{GeoPoint, Mission, MissionKind};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Annotates every mission with its distance from the given position.
///
/// A full recompute on every call; there is no incremental update. With no
/// position, distances are cleared rather than left stale.
pub fn compute_distances(position: Option<GeoPoint>, missions: &mut [Mission]) {
    for mission in missions {
        mission.distance_km = position.map(|p| haversine_km(p, mission.location));
    }
}

/// The missions administratively responsible for a user.
#[derive(Debug, Clone, Default)]
pub struct Jurisdiction {
    pub nearest_consulate_general: Option<Mission>,
    pub nearest_embassy: Option<Mission>,
}

impl Jurisdiction {
    /// The mission that actually handles the user's consular affairs:
    /// the nearest consulate general when one exists, else the nearest
    /// embassy, else none.
    pub fn effective(&self) -> Option<&Mission> {
        self.nearest_consulate_general
            .as_ref()
            .or(self.nearest_embassy.as_ref())
    }
}

/// Picks the nearest consulate general and embassy from annotated missions.
///
/// Missions without a computed distance are not candidates, so an unknown
/// position (or an empty directory) resolves to no jurisdiction. Exact
/// distance ties keep the first mission encountered.
pub fn resolve(missions: &[Mission]) -> Jurisdiction {
    Jurisdiction {
        nearest_consulate_general: nearest_of_kind(missions, MissionKind::ConsulateGeneral),
        nearest_embassy: nearest_of_kind(missions, MissionKind::Embassy),
    }
}

fn nearest_of_kind(missions: &[Mission], kind: MissionKind) -> Option<Mission> {
    let mut best: Option<&Mission> = None;
    for mission in missions {
        if mission.kind != kind {
            continue;
        }
        let Some(distance) = mission.distance_km else {
            continue;
        };
        let beaten = match best.and_then(|b| b.distance_km) {
            Some(best_distance) => distance < best_distance,
            None => true,
        };
        if beaten {
            best = Some(mission);
        }
    }
    best.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: GeoPoint = GeoPoint {
        longitude: 2.3522,
        latitude: 48.8566,
    };
    const MARSEILLE: GeoPoint = GeoPoint {
        longitude: 5.3698,
        latitude: 43.2965,
    };
    const LYON: GeoPoint = GeoPoint {
        longitude: 4.8357,
        latitude: 45.764,
    };

    fn mission(id: &str, kind: MissionKind, location: GeoPoint) -> Mission {
        Mission {
            id: id.into(),
            kind,
            country_code: "FR".into(),
            city: id.into(),
            location,
            distance_km: None,
        }
    }

    #[test]
    fn haversine_is_symmetric() {
        let there = haversine_km(PARIS, MARSEILLE);
        let back = haversine_km(MARSEILLE, PARIS);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert_eq!(haversine_km(PARIS, PARIS), 0.0);
    }

    #[test]
    fn haversine_paris_marseille_is_plausible() {
        // Roughly 660 km as the crow flies.
        let d = haversine_km(PARIS, MARSEILLE);
        assert!((d - 660.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn compute_distances_annotates_every_mission() {
        let mut missions = vec![
            mission("marseille", MissionKind::ConsulateGeneral, MARSEILLE),
            mission("lyon", MissionKind::Embassy, LYON),
        ];
        compute_distances(Some(PARIS), &mut missions);
        assert!(missions.iter().all(|m| m.distance_km.is_some()));
    }

    #[test]
    fn compute_distances_without_position_clears() {
        let mut missions = vec![mission("lyon", MissionKind::Embassy, LYON)];
        compute_distances(Some(PARIS), &mut missions);
        compute_distances(None, &mut missions);
        assert!(missions[0].distance_km.is_none());
    }

    #[test]
    fn consulate_general_supersedes_nearer_embassy() {
        // Embassy in Lyon is much closer to Paris than the consulate
        // general in Marseille; the consulate general still wins.
        let mut missions = vec![
            mission("lyon", MissionKind::Embassy, LYON),
            mission("marseille", MissionKind::ConsulateGeneral, MARSEILLE),
        ];
        compute_distances(Some(PARIS), &mut missions);

        let jurisdiction = resolve(&missions);
        assert_eq!(jurisdiction.effective().unwrap().id, "marseille");
    }

    #[test]
    fn falls_back_to_nearest_embassy() {
        let mut missions = vec![
            mission("marseille", MissionKind::Embassy, MARSEILLE),
            mission("lyon", MissionKind::Embassy, LYON),
        ];
        compute_distances(Some(PARIS), &mut missions);

        let jurisdiction = resolve(&missions);
        assert!(jurisdiction.nearest_consulate_general.is_none());
        assert_eq!(jurisdiction.effective().unwrap().id, "lyon");
    }

    #[test]
    fn other_mission_kinds_are_not_candidates() {
        let mut missions = vec![
            mission("lyon", MissionKind::HonoraryConsulate, LYON),
            mission("marseille", MissionKind::Consulate, MARSEILLE),
        ];
        compute_distances(Some(PARIS), &mut missions);

        let jurisdiction = resolve(&missions);
        assert!(jurisdiction.effective().is_none());
    }

    #[test]
    fn empty_directory_resolves_to_none() {
        let jurisdiction = resolve(&[]);
        assert!(jurisdiction.effective().is_none());
        assert!(jurisdiction.nearest_embassy.is_none());
    }

    #[test]
    fn unannotated_missions_are_not_candidates() {
        // No position was ever resolved: distances are all None.
        let missions = vec![mission("lyon", MissionKind::Embassy, LYON)];
        let jurisdiction = resolve(&missions);
        assert!(jurisdiction.effective().is_none());
    }
}
