//! The request lifecycle engine: legal transitions and audited mutations.
//!
//! Every mutating operation takes the storage handle as an explicit
//! dependency, re-reads the request, applies the change, writes the scalar
//! fields back, and appends exactly one activity row. The transition table
//! lives on [`RequestStatus::allowed_targets`]; nothing in this module
//! invents an edge that table does not grant.

use jiff::Timestamp;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::model::{
    Activity, ActivityKind, Note, NoteKind, Priority, RequestStatus, ServiceRequest,
};
use crate::storage::{RequestFilter, Storage, StorageError};

/// Errors surfaced by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The requested status change is not an edge of the transition table.
    /// Nothing was written.
    #[error("cannot move a {from} request to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = core::result::Result<T, LifecycleError>;

/// Fields the citizen supplies when opening a request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub service_id: String,
    pub organization_id: String,
    pub profile_id: String,
    pub requester_id: String,
    pub priority: Priority,
    pub data: Map<String, Value>,
}

/// Creates a request in `Draft` with its opening `RequestCreated` activity.
///
/// The external references are recorded as given; their validity is the
/// remote collections' concern, not this engine's.
pub fn create(storage: &Storage, new: NewRequest) -> Result<ServiceRequest> {
    let id = Uuid::new_v4();
    let created_at = Timestamp::now();
    let request = ServiceRequest {
        id,
        number: request_number(id),
        status: RequestStatus::Draft,
        priority: new.priority,
        service_id: new.service_id,
        organization_id: new.organization_id,
        profile_id: new.profile_id,
        requester_id: new.requester_id.clone(),
        assigned_agent_id: None,
        data: new.data,
        document_ids: Vec::new(),
        notes: Vec::new(),
        activities: Vec::new(),
        created_at,
        submitted_at: None,
        assigned_at: None,
        completed_at: None,
    };
    storage.create_request(&request)?;
    storage.append_activity(
        id,
        &Activity {
            kind: ActivityKind::RequestCreated,
            actor_id: Some(new.requester_id),
            data: json!({"serviceId": request.service_id}),
            at: created_at,
        },
    )?;
    Ok(storage.load_request(id)?)
}

/// Moves a request to a new status, enforcing the transition table.
pub fn change_status(
    storage: &Storage,
    id: Uuid,
    target: RequestStatus,
    actor: Option<&str>,
) -> Result<ServiceRequest> {
    apply_status(storage, id, target, actor, None)
}

/// Convenience wrapper: `Draft` → `Submitted`.
pub fn submit(storage: &Storage, id: Uuid, actor: Option<&str>) -> Result<ServiceRequest> {
    apply_status(storage, id, RequestStatus::Submitted, actor, None)
}

/// Convenience wrapper: `Validated` → `Completed`.
pub fn complete(storage: &Storage, id: Uuid, actor: Option<&str>) -> Result<ServiceRequest> {
    apply_status(storage, id, RequestStatus::Completed, actor, None)
}

/// Convenience wrapper to `Rejected`, with an optional human-readable
/// reason. The reason rides on the status-change activity and is also
/// appended as an internal note, so staff see it without reading the
/// audit log.
pub fn reject(
    storage: &Storage,
    id: Uuid,
    reason: Option<&str>,
    actor: Option<&str>,
) -> Result<ServiceRequest> {
    let request = apply_status(storage, id, RequestStatus::Rejected, actor, reason)?;
    let Some(reason) = reason else {
        return Ok(request);
    };
    storage.append_note(
        id,
        &Note {
            kind: NoteKind::Internal,
            content: reason.to_string(),
            author_id: actor.map(String::from),
            created_at: Timestamp::now(),
        },
    )?;
    Ok(storage.load_request(id)?)
}

/// Assigns an agent, moving the request forward as a side effect.
///
/// Legal only where `Assigned` or `UnderReview` is an allowed target of the
/// current status: from `UnderReview` the request becomes `Assigned`; from
/// `Submitted` or `AwaitingDocuments` it (re-)enters `UnderReview` with the
/// agent recorded. One `RequestAssigned` activity, no `StatusChanged`.
pub fn assign(
    storage: &Storage,
    id: Uuid,
    agent_id: &str,
    assigned_by: Option<&str>,
) -> Result<ServiceRequest> {
    let mut request = storage.load_request(id)?;
    let from = request.status;
    let target = if from.can_transition_to(RequestStatus::Assigned) {
        RequestStatus::Assigned
    } else if from.can_transition_to(RequestStatus::UnderReview) {
        RequestStatus::UnderReview
    } else {
        return Err(LifecycleError::InvalidTransition {
            from,
            to: RequestStatus::Assigned,
        });
    };

    let now = Timestamp::now();
    request.status = target;
    request.assigned_agent_id = Some(agent_id.to_string());
    if request.assigned_at.is_none() {
        request.assigned_at = Some(now);
    }
    storage.update_request(&request)?;
    storage.append_activity(
        id,
        &Activity {
            kind: ActivityKind::RequestAssigned,
            actor_id: assigned_by.map(String::from),
            data: json!({"agentId": agent_id, "status": target.as_str()}),
            at: now,
        },
    )?;
    Ok(storage.load_request(id)?)
}

/// Appends a note and its `CommentAdded` activity.
pub fn add_note(
    storage: &Storage,
    id: Uuid,
    content: &str,
    kind: NoteKind,
    author: Option<&str>,
) -> Result<ServiceRequest> {
    let now = Timestamp::now();
    storage.append_note(
        id,
        &Note {
            kind,
            content: content.to_string(),
            author_id: author.map(String::from),
            created_at: now,
        },
    )?;
    storage.append_activity(
        id,
        &Activity {
            kind: ActivityKind::CommentAdded,
            actor_id: author.map(String::from),
            data: json!({"noteKind": kind.as_str()}),
            at: now,
        },
    )?;
    Ok(storage.load_request(id)?)
}

/// Adds a document reference. Re-adding a present id is a complete no-op:
/// the set is unchanged and no activity is appended — the audit log records
/// effects, not attempts.
pub fn add_document(
    storage: &Storage,
    id: Uuid,
    document_id: &str,
    actor: Option<&str>,
) -> Result<ServiceRequest> {
    if storage.add_document(id, document_id)? {
        storage.append_activity(
            id,
            &Activity {
                kind: ActivityKind::DocumentUploaded,
                actor_id: actor.map(String::from),
                data: json!({"documentId": document_id}),
                at: Timestamp::now(),
            },
        )?;
    }
    Ok(storage.load_request(id)?)
}

/// Removes a document reference. Removing an absent id is a complete no-op.
pub fn remove_document(
    storage: &Storage,
    id: Uuid,
    document_id: &str,
    actor: Option<&str>,
) -> Result<ServiceRequest> {
    if storage.remove_document(id, document_id)? {
        storage.append_activity(
            id,
            &Activity {
                kind: ActivityKind::DocumentDeleted,
                actor_id: actor.map(String::from),
                data: json!({"documentId": document_id}),
                at: Timestamp::now(),
            },
        )?;
    }
    Ok(storage.load_request(id)?)
}

/// Loads one request.
pub fn get(storage: &Storage, id: Uuid) -> Result<ServiceRequest> {
    Ok(storage.load_request(id)?)
}

/// Looks up one request by its human-readable number.
pub fn get_by_number(storage: &Storage, number: &str) -> Result<ServiceRequest> {
    Ok(storage.get_by_number(number)?)
}

/// Lists requests matching the filter, newest first.
pub fn list(storage: &Storage, filter: &RequestFilter) -> Result<Vec<ServiceRequest>> {
    Ok(storage.list_requests(filter)?)
}

/// Aggregate count per status, optionally scoped to one organization.
pub fn status_counts(
    storage: &Storage,
    organization_id: Option<&str>,
) -> Result<Vec<(RequestStatus, u64)>> {
    Ok(storage.status_counts(organization_id)?)
}

/// The one path every status change goes through.
fn apply_status(
    storage: &Storage,
    id: Uuid,
    target: RequestStatus,
    actor: Option<&str>,
    reason: Option<&str>,
) -> Result<ServiceRequest> {
    let mut request = storage.load_request(id)?;
    let from = request.status;
    if !from.can_transition_to(target) {
        return Err(LifecycleError::InvalidTransition { from, to: target });
    }

    let now = Timestamp::now();
    request.status = target;
    if target == RequestStatus::Submitted && request.submitted_at.is_none() {
        request.submitted_at = Some(now);
    }
    if target == RequestStatus::Completed && request.completed_at.is_none() {
        request.completed_at = Some(now);
    }
    storage.update_request(&request)?;

    // Completion gets its own activity kind; everything else is a plain
    // status change. Exactly one entry either way.
    let kind = if target == RequestStatus::Completed {
        ActivityKind::RequestCompleted
    } else {
        ActivityKind::StatusChanged
    };
    let mut data = json!({"from": from.as_str(), "to": target.as_str()});
    if let Some(reason) = reason {
        data["reason"] = json!(reason);
    }
    storage.append_activity(
        id,
        &Activity {
            kind,
            actor_id: actor.map(String::from),
            data,
            at: now,
        },
    )?;
    Ok(storage.load_request(id)?)
}

/// Human-readable reference derived from the request id.
fn request_number(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("REQ-{}", hex[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    fn sample_new_request() -> NewRequest {
        NewRequest {
            service_id: "passport-renewal".into(),
            organization_id: "org-marseille".into(),
            profile_id: "prof-17".into(),
            requester_id: "prof-17".into(),
            priority: Priority::Normal,
            data: Map::new(),
        }
    }

    /// Creates a request and forces it into the given status, bypassing the
    /// engine. Storage has no opinion on status values; only the lifecycle
    /// guards transitions.
    fn request_in_status(storage: &Storage, status: RequestStatus) -> ServiceRequest {
        let mut request = create(storage, sample_new_request()).unwrap();
        request.status = status;
        storage.update_request(&request).unwrap();
        request
    }

    #[test]
    fn create_opens_in_draft_with_one_activity() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        assert_eq!(request.status, RequestStatus::Draft);
        assert!(request.number.starts_with("REQ-"));
        assert_eq!(request.activities.len(), 1);
        assert_eq!(request.activities[0].kind, ActivityKind::RequestCreated);
        assert!(request.notes.is_empty());
        assert!(request.document_ids.is_empty());
        assert!(request.submitted_at.is_none());
        assert!(request.assigned_at.is_none());
        assert!(request.completed_at.is_none());
    }

    #[test]
    fn transition_legality_matches_table_exhaustively() {
        let storage = test_storage();
        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                let request = request_in_status(&storage, from);
                let result = change_status(&storage, request.id, to, None);
                if from.can_transition_to(to) {
                    let updated = result.unwrap();
                    assert_eq!(updated.status, to, "{from} -> {to}");
                } else {
                    let err = result.unwrap_err();
                    assert!(
                        matches!(err, LifecycleError::InvalidTransition { .. }),
                        "{from} -> {to} should be illegal"
                    );
                }
            }
        }
    }

    #[test]
    fn illegal_transition_writes_nothing() {
        let storage = test_storage();
        let request = request_in_status(&storage, RequestStatus::Completed);

        let err = change_status(&storage, request.id, RequestStatus::UnderReview, None)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));

        let reloaded = get(&storage, request.id).unwrap();
        assert_eq!(reloaded.status, RequestStatus::Completed);
        // Only the opening activity: the failed attempt left no trace.
        assert_eq!(reloaded.activities.len(), 1);
    }

    #[test]
    fn activity_log_grows_by_one_per_mutation_in_order() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        submit(&storage, request.id, None).unwrap();
        add_document(&storage, request.id, "doc1", None).unwrap();
        let updated = add_note(
            &storage,
            request.id,
            "Dossier reçu",
            NoteKind::Internal,
            Some("agent-dupont"),
        )
        .unwrap();

        let kinds: Vec<ActivityKind> = updated.activities.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::RequestCreated,
                ActivityKind::StatusChanged,
                ActivityKind::DocumentUploaded,
                ActivityKind::CommentAdded,
            ]
        );
    }

    #[test]
    fn submitted_at_is_set_once_and_stable() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        let submitted = submit(&storage, request.id, None).unwrap();
        let stamp = submitted.submitted_at.unwrap();

        // Walk further through the lifecycle; the stamp must not move.
        let reviewed =
            change_status(&storage, request.id, RequestStatus::UnderReview, None).unwrap();
        assert_eq!(reviewed.submitted_at, Some(stamp));

        let validated =
            change_status(&storage, request.id, RequestStatus::Validated, None).unwrap();
        assert_eq!(validated.submitted_at, Some(stamp));
    }

    #[test]
    fn scenario_passport_granted() {
        // create → submit → assign → validate → complete
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        submit(&storage, request.id, Some("prof-17")).unwrap();
        let assigned = assign(&storage, request.id, "A1", Some("chief")).unwrap();
        assert_eq!(assigned.status, RequestStatus::UnderReview);
        assert_eq!(assigned.assigned_agent_id.as_deref(), Some("A1"));
        assert!(assigned.assigned_at.is_some());

        change_status(&storage, request.id, RequestStatus::Validated, Some("A1")).unwrap();
        let done = complete(&storage, request.id, Some("A1")).unwrap();

        assert_eq!(done.status, RequestStatus::Completed);
        assert_eq!(done.assigned_agent_id.as_deref(), Some("A1"));
        assert_eq!(done.activities.len(), 5);
        assert_eq!(done.activities[2].kind, ActivityKind::RequestAssigned);
        assert_eq!(done.activities[4].kind, ActivityKind::RequestCompleted);
        assert!(done.submitted_at.is_some());
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn scenario_rejected_with_reason() {
        // create → submit → reject("Document illisible")
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        submit(&storage, request.id, None).unwrap();
        let rejected = reject(
            &storage,
            request.id,
            Some("Document illisible"),
            Some("agent-dupont"),
        )
        .unwrap();

        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.notes.len(), 1);
        assert_eq!(rejected.notes[0].kind, NoteKind::Internal);
        assert_eq!(rejected.notes[0].content, "Document illisible");

        let status_change = rejected
            .activities
            .iter()
            .find(|a| a.kind == ActivityKind::StatusChanged && a.data["to"] == "rejected")
            .unwrap();
        assert_eq!(status_change.data["reason"], "Document illisible");
        // Exactly three mutations: created, submitted, rejected.
        assert_eq!(rejected.activities.len(), 3);
        assert!(rejected.completed_at.is_none());
    }

    #[test]
    fn reject_without_reason_adds_no_note() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();
        submit(&storage, request.id, None).unwrap();

        let rejected = reject(&storage, request.id, None, None).unwrap();
        assert!(rejected.notes.is_empty());
        assert_eq!(rejected.activities.len(), 3);
    }

    #[test]
    fn assign_from_under_review_moves_to_assigned() {
        let storage = test_storage();
        let request = request_in_status(&storage, RequestStatus::UnderReview);

        let assigned = assign(&storage, request.id, "A2", None).unwrap();
        assert_eq!(assigned.status, RequestStatus::Assigned);
    }

    #[test]
    fn assign_from_draft_is_illegal() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        let err = assign(&storage, request.id, "A1", None).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn reassignment_keeps_first_assigned_at() {
        let storage = test_storage();
        let request = request_in_status(&storage, RequestStatus::Submitted);

        let first = assign(&storage, request.id, "A1", None).unwrap();
        let stamp = first.assigned_at.unwrap();

        // Back through awaiting-documents, then assign a second agent.
        change_status(&storage, request.id, RequestStatus::AwaitingDocuments, None).unwrap();
        let second = assign(&storage, request.id, "A2", None).unwrap();

        assert_eq!(second.assigned_agent_id.as_deref(), Some("A2"));
        assert_eq!(second.assigned_at, Some(stamp));
    }

    #[test]
    fn duplicate_document_add_is_a_silent_no_op() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        add_document(&storage, request.id, "doc1", None).unwrap();
        let after = add_document(&storage, request.id, "doc1", None).unwrap();

        assert_eq!(after.document_ids, vec!["doc1".to_string()]);
        // created + one upload; the duplicate attempt logged nothing.
        assert_eq!(after.activities.len(), 2);
    }

    #[test]
    fn remove_absent_document_is_a_silent_no_op() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        let after = remove_document(&storage, request.id, "doc1", None).unwrap();
        assert!(after.document_ids.is_empty());
        assert_eq!(after.activities.len(), 1);
    }

    #[test]
    fn document_round_trip_logs_both_effects() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        add_document(&storage, request.id, "doc1", Some("prof-17")).unwrap();
        let after = remove_document(&storage, request.id, "doc1", Some("prof-17")).unwrap();

        assert!(after.document_ids.is_empty());
        let kinds: Vec<ActivityKind> = after.activities.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::RequestCreated,
                ActivityKind::DocumentUploaded,
                ActivityKind::DocumentDeleted,
            ]
        );
    }

    #[test]
    fn notes_are_append_only_and_ordered() {
        let storage = test_storage();
        let request = create(&storage, sample_new_request()).unwrap();

        add_note(&storage, request.id, "first", NoteKind::Internal, None).unwrap();
        let after = add_note(
            &storage,
            request.id,
            "second",
            NoteKind::CitizenVisible,
            None,
        )
        .unwrap();

        assert_eq!(after.notes.len(), 2);
        assert_eq!(after.notes[0].content, "first");
        assert_eq!(after.notes[1].kind, NoteKind::CitizenVisible);
    }

    #[test]
    fn operations_on_unknown_request_are_not_found() {
        let storage = test_storage();
        let missing = Uuid::new_v4();

        let err = submit(&storage, missing, None).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Storage(StorageError::RequestNotFound(_))
        ));

        let err = add_note(&storage, missing, "x", NoteKind::Internal, None).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Storage(StorageError::RequestNotFound(_))
        ));
    }

    #[test]
    fn list_and_counts_see_lifecycle_results() {
        let storage = test_storage();
        let first = create(&storage, sample_new_request()).unwrap();
        create(&storage, sample_new_request()).unwrap();
        submit(&storage, first.id, None).unwrap();

        let submitted_only = list(
            &storage,
            &RequestFilter {
                statuses: vec![RequestStatus::Submitted],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(submitted_only.len(), 1);
        assert_eq!(submitted_only[0].id, first.id);

        let counts = status_counts(&storage, None).unwrap();
        let drafts = counts.iter().find(|(s, _)| *s == RequestStatus::Draft).unwrap();
        assert_eq!(drafts.1, 1);
    }
}
