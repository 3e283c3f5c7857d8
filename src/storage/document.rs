//! Document reference storage: a deduplicated set per request.
//!
//! The documents themselves live in an external store; only their ids are
//! tracked here. The primary key makes the set property structural:
//! re-adding an existing id changes nothing.

use rusqlite::params;
use uuid::Uuid;

use super::{Result, Storage, StorageError};

impl Storage {
    /// Adds a document reference. Returns `true` when the set grew,
    /// `false` when the id was already present.
    pub fn add_document(&self, request_id: Uuid, document_id: &str) -> Result<bool> {
        if !self.request_exists(request_id)? {
            return Err(StorageError::RequestNotFound(request_id.to_string()));
        }
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO documents (request_id, document_id) VALUES (?1, ?2)",
            params![request_id.to_string(), document_id],
        )?;
        Ok(rows > 0)
    }

    /// Removes a document reference. Returns `true` when it was present.
    pub fn remove_document(&self, request_id: Uuid, document_id: &str) -> Result<bool> {
        if !self.request_exists(request_id)? {
            return Err(StorageError::RequestNotFound(request_id.to_string()));
        }
        let rows = self.conn.execute(
            "DELETE FROM documents WHERE request_id = ?1 AND document_id = ?2",
            params![request_id.to_string(), document_id],
        )?;
        Ok(rows > 0)
    }

    /// Loads a request's document references in upload order.
    pub fn load_documents(&self, request_id: Uuid) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id FROM documents WHERE request_id = ?1 ORDER BY rowid",
        )?;
        let ids = stmt
            .query_map(params![request_id.to_string()], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use serde_json::Map;

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
            service_id: "legalization".into(),
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

    #[test]
    fn add_is_deduplicated() {
        let storage = test_storage();
        let request = sample_request();
        storage.create_request(&request).unwrap();

        assert!(storage.add_document(request.id, "doc1").unwrap());
        assert!(!storage.add_document(request.id, "doc1").unwrap());

        let documents = storage.load_documents(request.id).unwrap();
        assert_eq!(documents, vec!["doc1".to_string()]);
    }

    #[test]
    fn remove_reports_presence() {
        let storage = test_storage();
        let request = sample_request();
        storage.create_request(&request).unwrap();

        storage.add_document(request.id, "doc1").unwrap();
        assert!(storage.remove_document(request.id, "doc1").unwrap());
        assert!(!storage.remove_document(request.id, "doc1").unwrap());
        assert!(storage.load_documents(request.id).unwrap().is_empty());
    }

    #[test]
    fn preserves_upload_order() {
        let storage = test_storage();
        let request = sample_request();
        storage.create_request(&request).unwrap();

        storage.add_document(request.id, "passport-scan").unwrap();
        storage.add_document(request.id, "photo").unwrap();

        let documents = storage.load_documents(request.id).unwrap();
        assert_eq!(documents, vec!["passport-scan".to_string(), "photo".to_string()]);
    }

    #[test]
    fn add_document_nonexistent_request_fails() {
        let storage = test_storage();
        let err = storage.add_document(Uuid::new_v4(), "doc1").unwrap_err();
        assert!(matches!(err, StorageError::RequestNotFound(_)));
    }
}
