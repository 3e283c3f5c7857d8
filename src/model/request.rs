//! Service request types: the unit of work in guichet.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Activity, Note};

/// A citizen-initiated application for a consular service, tracked
/// through a fixed set of states with an append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub id: Uuid,

    /// Human-readable reference, e.g. `REQ-A3B0FC12`. Unique.
    pub number: String,

    pub status: RequestStatus,
    pub priority: Priority,

    /// References to external entities; validity is the remote side's concern.
    pub service_id: String,
    pub organization_id: String,
    pub profile_id: String,
    pub requester_id: String,
    pub assigned_agent_id: Option<String>,

    /// Opaque per-service payload (form fields, options).
    pub data: Map<String, Value>,

    /// Deduplicated references to uploaded documents, in upload order.
    /// The documents themselves live elsewhere.
    pub document_ids: Vec<String>,

    /// Free-text annotations, append-only.
    pub notes: Vec<Note>,

    /// The authoritative history: one entry per successful mutation.
    pub activities: Vec<Activity>,

    pub created_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub assigned_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Where a request stands in its lifecycle.
///
/// This is the one canonical vocabulary. Citizen-facing relabelings
/// ("pending completion", "ready for pickup") live in the CLI formatting
/// layer and never enter the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    UnderReview,
    Assigned,
    AwaitingDocuments,
    Validated,
    Rejected,
    Completed,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Draft,
        Self::Submitted,
        Self::UnderReview,
        Self::Assigned,
        Self::AwaitingDocuments,
        Self::Validated,
        Self::Rejected,
        Self::Completed,
    ];

    /// The statuses a request in this status may legally move to.
    ///
    /// `Rejected` and `Completed` are terminal.
    pub fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Submitted],
            Self::Submitted => &[Self::UnderReview, Self::Rejected],
            Self::UnderReview => &[
                Self::Assigned,
                Self::AwaitingDocuments,
                Self::Rejected,
                Self::Validated,
            ],
            Self::Assigned => &[Self::AwaitingDocuments, Self::Validated, Self::Rejected],
            Self::AwaitingDocuments => &[Self::UnderReview, Self::Rejected],
            Self::Validated => &[Self::Completed],
            Self::Rejected | Self::Completed => &[],
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Storage and display token for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under-review",
            Self::Assigned => "assigned",
            Self::AwaitingDocuments => "awaiting-documents",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing priority, set at creation and immutable thereafter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Low, Self::Normal, Self::High, Self::Urgent]
            .into_iter()
            .find(|priority| priority.as_str() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_have_no_targets() {
        assert!(RequestStatus::Rejected.allowed_targets().is_empty());
        assert!(RequestStatus::Completed.allowed_targets().is_empty());
    }

    #[test]
    fn draft_only_submits() {
        assert_eq!(
            RequestStatus::Draft.allowed_targets(),
            &[RequestStatus::Submitted]
        );
        assert!(!RequestStatus::Draft.can_transition_to(RequestStatus::Completed));
    }

    #[test]
    fn status_str_round_trips() {
        for status in RequestStatus::ALL {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("unknown"), None);
    }

    #[test]
    fn priority_str_round_trips() {
        for priority in [
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Urgent,
        ] {
            assert_eq!(Priority::parse(priority.as_str()), Some(priority));
        }
        assert_eq!(Priority::parse("asap"), None);
    }
}
