//! One-shot position acquisition.
//!
//! The user position comes from a single query with two outcomes: success
//! with coordinates, or a typed failure. Rather than requiring flags on
//! every invocation, the position is resolved through a chain:
//!
//! 1. explicit `--longitude`/`--latitude` flags
//! 2. `GUICHET_POSITION` env var (`"lon,lat"`, set once per session)
//! 3. the configured `locate-command`, an external process printing
//!    `<longitude> <latitude>` — declining (non-zero exit) is `Denied`
//!
//! No retry, no timeout. Callers surface the failure message and leave
//! jurisdiction unresolved.

use std::{env, process::Command};

use crate::model::GeoPoint;

/// Why no position could be acquired.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    /// The locate command refused to provide a position.
    #[error("position request denied: {0}")]
    Denied(String),

    /// No position source is configured, or the source produced garbage.
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// Resolve the user position through the tiered chain.
pub fn resolve(
    explicit: Option<GeoPoint>,
    locate_command: Option<&str>,
) -> Result<GeoPoint, PositionError> {
    // 1. Explicit coordinates.
    if let Some(point) = explicit {
        return validated(point);
    }

    // 2. GUICHET_POSITION environment variable.
    if let Ok(raw) = env::var("GUICHET_POSITION")
        && !raw.is_empty()
    {
        let point = parse_pair(&raw)
            .ok_or_else(|| PositionError::Unavailable(format!("bad GUICHET_POSITION: {raw:?}")))?;
        return validated(point);
    }

    // 3. Configured locate command.
    if let Some(command) = locate_command {
        return run_locate(command);
    }

    Err(PositionError::Unavailable(
        "no position source: pass --longitude/--latitude, set GUICHET_POSITION, \
         or add `locate-command` to ~/.guichet/config.toml"
            .to_string(),
    ))
}

/// Run the locate command and parse `<longitude> <latitude>` from stdout.
fn run_locate(command: &str) -> Result<GeoPoint, PositionError> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(PositionError::Unavailable("empty locate-command".to_string()));
    };

    let output = Command::new(program)
        .args(parts)
        .output()
        .map_err(|e| PositionError::Unavailable(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PositionError::Denied(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let point = parse_pair(stdout.trim()).ok_or_else(|| {
        PositionError::Unavailable(format!("locate-command printed {:?}", stdout.trim()))
    })?;
    validated(point)
}

/// Parse `"lon,lat"` or `"lon lat"`.
fn parse_pair(raw: &str) -> Option<GeoPoint> {
    let mut parts = raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|s| !s.is_empty());
    let longitude = parts.next()?.parse().ok()?;
    let latitude = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(GeoPoint {
        longitude,
        latitude,
    })
}

fn validated(point: GeoPoint) -> Result<GeoPoint, PositionError> {
    let lon_ok = (-180.0..=180.0).contains(&point.longitude);
    let lat_ok = (-90.0..=90.0).contains(&point.latitude);
    if lon_ok && lat_ok {
        Ok(point)
    } else {
        Err(PositionError::Unavailable(format!(
            "coordinates out of range: ({}, {})",
            point.longitude, point.latitude
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_wins() {
        // Explicit coordinates short-circuit the chain; no env or command
        // is consulted.
        let point = GeoPoint {
            longitude: 2.35,
            latitude: 48.86,
        };
        let resolved = resolve(Some(point), None).unwrap();
        assert_eq!(resolved, point);
    }

    #[test]
    fn out_of_range_is_unavailable() {
        let point = GeoPoint {
            longitude: 181.0,
            latitude: 0.0,
        };
        let err = resolve(Some(point), None).unwrap_err();
        assert!(matches!(err, PositionError::Unavailable(_)));
    }

    #[test]
    fn no_source_is_unavailable() {
        // Assumes GUICHET_POSITION is unset in the test environment.
        let err = resolve(None, None).unwrap_err();
        assert!(matches!(err, PositionError::Unavailable(_)));
    }

    #[test]
    fn locate_command_success() {
        let point = resolve(None, Some("echo 5.3698 43.2965")).unwrap();
        assert!((point.longitude - 5.3698).abs() < 1e-9);
        assert!((point.latitude - 43.2965).abs() < 1e-9);
    }

    #[test]
    fn locate_command_refusal_is_denied() {
        let err = resolve(None, Some("false")).unwrap_err();
        assert!(matches!(err, PositionError::Denied(_)));
    }

    #[test]
    fn locate_command_garbage_is_unavailable() {
        let err = resolve(None, Some("echo somewhere")).unwrap_err();
        assert!(matches!(err, PositionError::Unavailable(_)));
    }

    #[test]
    fn parses_comma_and_space_pairs() {
        assert!(parse_pair("2.35,48.86").is_some());
        assert!(parse_pair("2.35 48.86").is_some());
        assert!(parse_pair("2.35, 48.86").is_some());
        assert!(parse_pair("2.35").is_none());
        assert!(parse_pair("2.35 48.86 7").is_none());
    }
}
