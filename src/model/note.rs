//! Notes: free-text annotations on a service request.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A free-text annotation, either internal-only or visible to the citizen.
///
/// Notes are append-only: never edited or removed once added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub kind: NoteKind,
    pub content: String,
    pub author_id: Option<String>,
    pub created_at: Timestamp,
}

/// Who gets to read a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteKind {
    /// Staff-only.
    Internal,

    /// Shown to the citizen on their request page.
    CitizenVisible,
}

impl NoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::CitizenVisible => "citizen-visible",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(Self::Internal),
            "citizen-visible" => Some(Self::CitizenVisible),
            _ => None,
        }
    }
}
