//! Activity storage: the append-only audit trail.
//!
//! Appends are plain row INSERTs — concurrent writers each land their own
//! row instead of racing over a serialized array. Nothing here updates or
//! deletes; history is permanent.

use rusqlite::params;
use uuid::Uuid;

use crate::model::{Activity, ActivityKind};

use super::{Result, Storage, StorageError, timestamp_from_ms};

impl Storage {
    /// Appends an activity to a request's audit trail.
    pub fn append_activity(&self, request_id: Uuid, activity: &Activity) -> Result<()> {
        if !self.request_exists(request_id)? {
            return Err(StorageError::RequestNotFound(request_id.to_string()));
        }
        let data_json = serde_json::to_string(&activity.data)?;
        self.conn.execute(
            "INSERT INTO activities (request_id, kind, actor_id, data_json, at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                request_id.to_string(),
                activity.kind.as_str(),
                &activity.actor_id,
                data_json,
                activity.at.as_millisecond(),
            ],
        )?;
        Ok(())
    }

    /// Loads a request's audit trail in append order.
    pub fn load_activities(&self, request_id: Uuid) -> Result<Vec<Activity>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, actor_id, data_json, at
             FROM activities WHERE request_id = ?1 ORDER BY id",
        )?;
        let rows: Vec<(String, Option<String>, String, i64)> = stmt
            .query_map(params![request_id.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter()
            .map(|(kind, actor_id, data_json, at)| {
                Ok(Activity {
                    kind: ActivityKind::parse(&kind).ok_or_else(|| {
                        StorageError::Corrupt(format!("unknown activity kind: {kind}"))
                    })?,
                    actor_id,
                    data: serde_json::from_str(&data_json)?,
                    at: timestamp_from_ms(at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use serde_json::{Map, json};

    use crate::model::{Priority, RequestStatus, ServiceRequest};

    fn test_storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    fn sample_request() -> ServiceRequest {
        let id = Uuid::new_v4();
        ServiceRequest {
            id,
            number: format!("REQ-{}", &id.simple().to_string()[..8].to_uppercase()),
            status: RequestStatus::Draft,
            priority: Priority::Normal,
            service_id: "consular-card".into(),
            organization_id: "org-1".into(),
            profile_id: "prof-1".into(),
            requester_id: "prof-1".into(),
            assigned_agent_id: None,
            data: Map::new(),
            document_ids: vec![],
            notes: vec![],
            activities: vec![],
            created_at: Timestamp::now(),
            submitted_at: None,
            assigned_at: None,
            completed_at: None,
        }
    }

    fn sample_activity(kind: ActivityKind) -> Activity {
        Activity {
            kind,
            actor_id: Some("agent-1".into()),
            data: json!({"to": "submitted"}),
            at: Timestamp::now(),
        }
    }

    #[test]
    fn append_and_load_activities_in_order() {
        let storage = test_storage();
        let request = sample_request();
        storage.create_request(&request).unwrap();

        storage
            .append_activity(request.id, &sample_activity(ActivityKind::RequestCreated))
            .unwrap();
        storage
            .append_activity(request.id, &sample_activity(ActivityKind::StatusChanged))
            .unwrap();

        let activities = storage.load_activities(request.id).unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].kind, ActivityKind::RequestCreated);
        assert_eq!(activities[1].kind, ActivityKind::StatusChanged);
        assert_eq!(activities[1].data["to"], "submitted");
    }

    #[test]
    fn append_activity_nonexistent_request_fails() {
        let storage = test_storage();
        let err = storage
            .append_activity(Uuid::new_v4(), &sample_activity(ActivityKind::RequestCreated))
            .unwrap_err();
        assert!(matches!(err, StorageError::RequestNotFound(_)));
    }
}
