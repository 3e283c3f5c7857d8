//! Activities: the audit trail of a service request.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable audit-log entry, appended whenever a request is mutated.
///
/// The activity sequence is the authoritative history: exactly one entry
/// per successful mutation, in call order, never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub kind: ActivityKind,
    pub actor_id: Option<String>,
    /// Kind-specific payload: new status, agent id, document id, reason.
    pub data: Value,
    pub at: Timestamp,
}

/// What happened to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    RequestCreated,
    StatusChanged,
    RequestAssigned,
    DocumentUploaded,
    DocumentDeleted,
    CommentAdded,
    RequestCompleted,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestCreated => "request-created",
            Self::StatusChanged => "status-changed",
            Self::RequestAssigned => "request-assigned",
            Self::DocumentUploaded => "document-uploaded",
            Self::DocumentDeleted => "document-deleted",
            Self::CommentAdded => "comment-added",
            Self::RequestCompleted => "request-completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::RequestCreated,
            Self::StatusChanged,
            Self::RequestAssigned,
            Self::DocumentUploaded,
            Self::DocumentDeleted,
            Self::CommentAdded,
            Self::RequestCompleted,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}
