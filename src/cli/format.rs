//! Output formatting for CLI display.
//!
//! The citizen-facing status relabelings live here and nowhere else: the
//! engine's canonical vocabulary never changes, the desk just words two of
//! its states differently for the public.

use crate::model::{Activity, ActivityKind, Mission, MissionKind, Priority, RequestStatus};

/// Staff-facing status label.
pub(super) fn status_label(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Draft => "draft",
        RequestStatus::Submitted => "submitted",
        RequestStatus::UnderReview => "under review",
        RequestStatus::Assigned => "assigned",
        RequestStatus::AwaitingDocuments => "awaiting documents",
        RequestStatus::Validated => "validated",
        RequestStatus::Rejected => "rejected",
        RequestStatus::Completed => "completed",
    }
}

/// Citizen-facing status label, as shown on the public request page.
pub(super) fn citizen_status_label(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::AwaitingDocuments => "pending completion",
        RequestStatus::Validated => "ready for pickup",
        other => status_label(other),
    }
}

pub(super) fn priority_label(priority: Priority) -> &'static str {
    priority.as_str()
}

pub(super) fn mission_kind_label(kind: MissionKind) -> &'static str {
    match kind {
        MissionKind::Embassy => "embassy",
        MissionKind::ConsulateGeneral => "consulate general",
        MissionKind::Consulate => "consulate",
        MissionKind::HonoraryConsulate => "honorary consulate",
    }
}

/// One mission line for directory and locate listings.
pub(super) fn format_mission(mission: &Mission) -> String {
    let base = format!(
        "{}  {} ({})",
        mission.country_code,
        mission.city,
        mission_kind_label(mission.kind)
    );
    match mission.distance_km {
        Some(distance) => format!("{base}  {distance:.0} km"),
        None => base,
    }
}

/// One activity line for the request history.
pub(super) fn format_activity(activity: &Activity) -> String {
    let what = match activity.kind {
        ActivityKind::RequestCreated => "request created".to_string(),
        ActivityKind::StatusChanged => {
            let to = activity.data["to"].as_str().unwrap_or("?");
            match activity.data["reason"].as_str() {
                Some(reason) => format!("status changed to {to}: {reason}"),
                None => format!("status changed to {to}"),
            }
        }
        ActivityKind::RequestAssigned => {
            let agent = activity.data["agentId"].as_str().unwrap_or("?");
            format!("assigned to {agent}")
        }
        ActivityKind::DocumentUploaded => {
            let doc = activity.data["documentId"].as_str().unwrap_or("?");
            format!("document {doc} uploaded")
        }
        ActivityKind::DocumentDeleted => {
            let doc = activity.data["documentId"].as_str().unwrap_or("?");
            format!("document {doc} deleted")
        }
        ActivityKind::CommentAdded => "note added".to_string(),
        ActivityKind::RequestCompleted => "request completed".to_string(),
    };
    let who = activity.actor_id.as_deref().unwrap_or("system");
    format!("{}  {what}  [{who}]", activity.at)
}
