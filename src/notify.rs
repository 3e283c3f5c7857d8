//! Best-effort status-change notifications.
//!
//! After a successful status change the configured `notify-command` is run
//! with one JSON argument describing the change. Failure here must never
//! roll back or fail the status change: it is reported on stderr and
//! otherwise ignored.

use std::process::Command;

use serde::Serialize;
use uuid::Uuid;

use crate::model::RequestStatus;

/// The payload handed to the notify command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotification<'a> {
    pub request_id: Uuid,
    pub number: &'a str,
    pub old_status: RequestStatus,
    pub new_status: RequestStatus,
    /// The requester's email, when the profile is known.
    pub recipient_contact: Option<&'a str>,
    /// Citizen-visible note contents accompanying the change.
    pub notes: Vec<&'a str>,
}

/// Runs the notify command, if configured. Never fails the caller.
pub fn status_changed(command: Option<&str>, notification: &StatusNotification<'_>) {
    let Some(command) = command else {
        return;
    };
    if let Err(e) = run(command, notification) {
        eprintln!("Warning: notification failed: {e}");
    }
}

fn run(command: &str, notification: &StatusNotification<'_>) -> Result<(), String> {
    let payload = serde_json::to_string(notification)
        .map_err(|e| format!("could not encode payload: {e}"))?;

    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Err("empty notify-command".to_string());
    };

    let output = Command::new(program)
        .args(parts)
        .arg(payload)
        .output()
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("{program} exited with {}: {}", output.status, stderr.trim()))
    }
}
