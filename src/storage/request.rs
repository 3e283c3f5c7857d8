//! Request storage: create, load, update, look up, list, and count.
//!
//! `update_request` replaces scalar fields only. Notes, activities and
//! document references have their own append paths and are never touched
//! by an update.

use jiff::Timestamp;
use rusqlite::{OptionalExtension, Row, ToSql, params};
use uuid::Uuid;

use crate::model::{Priority, RequestStatus, ServiceRequest};

use super::{Result, Storage, StorageError, timestamp_from_ms};

/// Filters for listing requests. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Match any of these statuses. Empty means all statuses.
    pub statuses: Vec<RequestStatus>,
    pub priority: Option<Priority>,
    pub service_id: Option<String>,
    pub organization_id: Option<String>,
    pub profile_id: Option<String>,
    pub assigned_agent_id: Option<String>,
    /// Country of the handling organization (via the organizations table).
    pub country_code: Option<String>,
    pub created_since: Option<Timestamp>,
    pub created_until: Option<Timestamp>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Scalar columns of one request row, before notes/activities/documents
/// are attached.
struct RequestRow {
    id: String,
    number: String,
    status: String,
    priority: String,
    service_id: String,
    organization_id: String,
    profile_id: String,
    requester_id: String,
    assigned_agent_id: Option<String>,
    data_json: String,
    created_at: i64,
    submitted_at: Option<i64>,
    assigned_at: Option<i64>,
    completed_at: Option<i64>,
}

const REQUEST_COLUMNS: &str = "id, number, status, priority, service_id, organization_id, \
     profile_id, requester_id, assigned_agent_id, data_json, \
     created_at, submitted_at, assigned_at, completed_at";

impl Storage {
    /// Creates a new request row. Its notes/activities start empty; the
    /// lifecycle engine appends the opening activity separately.
    pub fn create_request(&self, request: &ServiceRequest) -> Result<()> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM requests WHERE id = ?1",
                params![request.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::RequestAlreadyExists(request.id));
        }

        let data_json = serde_json::to_string(&request.data)?;
        self.conn.execute(
            "INSERT INTO requests (id, number, status, priority, service_id, organization_id,
                                   profile_id, requester_id, assigned_agent_id, data_json,
                                   created_at, submitted_at, assigned_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                request.id.to_string(),
                &request.number,
                request.status.as_str(),
                request.priority.as_str(),
                &request.service_id,
                &request.organization_id,
                &request.profile_id,
                &request.requester_id,
                &request.assigned_agent_id,
                data_json,
                request.created_at.as_millisecond(),
                request.submitted_at.map(Timestamp::as_millisecond),
                request.assigned_at.map(Timestamp::as_millisecond),
                request.completed_at.map(Timestamp::as_millisecond),
            ],
        )?;
        Ok(())
    }

    /// Writes a request's scalar fields back as a whole.
    pub fn update_request(&self, request: &ServiceRequest) -> Result<()> {
        let data_json = serde_json::to_string(&request.data)?;
        let rows = self.conn.execute(
            "UPDATE requests
             SET status = ?1, priority = ?2, assigned_agent_id = ?3, data_json = ?4,
                 submitted_at = ?5, assigned_at = ?6, completed_at = ?7
             WHERE id = ?8",
            params![
                request.status.as_str(),
                request.priority.as_str(),
                &request.assigned_agent_id,
                data_json,
                request.submitted_at.map(Timestamp::as_millisecond),
                request.assigned_at.map(Timestamp::as_millisecond),
                request.completed_at.map(Timestamp::as_millisecond),
                request.id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::RequestNotFound(request.id.to_string()));
        }
        Ok(())
    }

    /// Loads a single request with its notes, activities and documents.
    pub fn load_request(&self, id: Uuid) -> Result<ServiceRequest> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], read_row)
            .optional()?
            .ok_or_else(|| StorageError::RequestNotFound(id.to_string()))?;
        self.hydrate(row)
    }

    /// Looks up a request by its human-readable number.
    ///
    /// "No such number" is `RequestNotFound`, distinct from database errors.
    pub fn get_by_number(&self, number: &str) -> Result<ServiceRequest> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE number = ?1");
        let row = self
            .conn
            .query_row(&sql, params![number], read_row)
            .optional()?
            .ok_or_else(|| StorageError::RequestNotFound(number.to_string()))?;
        self.hydrate(row)
    }

    /// Resolves a full UUID or unambiguous prefix to a request id.
    pub fn resolve_id(&self, prefix: &str) -> Result<Uuid> {
        if let Ok(id) = prefix.parse::<Uuid>() {
            return Ok(id);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id FROM requests WHERE id LIKE ?1 LIMIT 2")?;
        let pattern = format!("{prefix}%");
        let ids: Vec<String> = stmt
            .query_map(params![pattern], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        match ids.as_slice() {
            [] => Err(StorageError::RequestNotFound(prefix.to_string())),
            [id] => id
                .parse()
                .map_err(|e| StorageError::Corrupt(format!("invalid request id: {e}"))),
            _ => Err(StorageError::AmbiguousId(prefix.to_string())),
        }
    }

    /// Lists requests matching the filter, newest first.
    ///
    /// Ordering is `created_at` descending with id as tiebreak. Pages are
    /// cut by limit/offset; there is no snapshot isolation across pages.
    pub fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<ServiceRequest>> {
        let mut sql = format!("SELECT {REQUEST_COLUMNS} FROM requests");
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            clauses.push(format!("status IN ({placeholders})"));
            for status in &filter.statuses {
                params.push(Box::new(status.as_str()));
            }
        }
        if let Some(priority) = filter.priority {
            clauses.push("priority = ?".to_string());
            params.push(Box::new(priority.as_str()));
        }
        if let Some(service_id) = &filter.service_id {
            clauses.push("service_id = ?".to_string());
            params.push(Box::new(service_id.clone()));
        }
        if let Some(organization_id) = &filter.organization_id {
            clauses.push("organization_id = ?".to_string());
            params.push(Box::new(organization_id.clone()));
        }
        if let Some(profile_id) = &filter.profile_id {
            clauses.push("profile_id = ?".to_string());
            params.push(Box::new(profile_id.clone()));
        }
        if let Some(agent_id) = &filter.assigned_agent_id {
            clauses.push("assigned_agent_id = ?".to_string());
            params.push(Box::new(agent_id.clone()));
        }
        if let Some(country) = &filter.country_code {
            clauses.push(
                "EXISTS (SELECT 1 FROM organizations o
                         WHERE o.id = requests.organization_id AND o.country_code = ?)"
                    .to_string(),
            );
            params.push(Box::new(country.clone()));
        }
        if let Some(since) = filter.created_since {
            clauses.push("created_at >= ?".to_string());
            params.push(Box::new(since.as_millisecond()));
        }
        if let Some(until) = filter.created_until {
            clauses.push("created_at <= ?".to_string());
            params.push(Box::new(until.as_millisecond()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?");
        params.push(Box::new(filter.limit.map_or(-1, i64::from)));
        params.push(Box::new(i64::from(filter.offset.unwrap_or(0))));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows: Vec<RequestRow> = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| &**p)),
                read_row,
            )?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    /// Aggregate count per status, optionally scoped to one organization.
    ///
    /// Every status appears in the result, zero-filled, in lifecycle order.
    pub fn status_counts(&self, organization_id: Option<&str>) -> Result<Vec<(RequestStatus, u64)>> {
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        let sql = match organization_id {
            Some(org) => {
                params.push(Box::new(org.to_string()));
                "SELECT status, COUNT(*) FROM requests WHERE organization_id = ?1 GROUP BY status"
            }
            None => "SELECT status, COUNT(*) FROM requests GROUP BY status",
        };

        let mut stmt = self.conn.prepare(sql)?;
        let counted: Vec<(String, u64)> = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| &**p)),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?
            .collect::<rusqlite::Result<_>>()?;

        let mut counts: Vec<(RequestStatus, u64)> =
            RequestStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for (status_str, count) in counted {
            let status = RequestStatus::parse(&status_str)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown status: {status_str}")))?;
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == status) {
                slot.1 = count;
            }
        }
        Ok(counts)
    }

    /// Attaches notes, activities and documents to a scalar row.
    fn hydrate(&self, row: RequestRow) -> Result<ServiceRequest> {
        let id: Uuid = row
            .id
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("invalid request id: {e}")))?;
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown status: {}", row.status)))?;
        let priority = Priority::parse(&row.priority)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown priority: {}", row.priority)))?;
        let data = serde_json::from_str(&row.data_json)?;

        Ok(ServiceRequest {
            id,
            number: row.number,
            status,
            priority,
            service_id: row.service_id,
            organization_id: row.organization_id,
            profile_id: row.profile_id,
            requester_id: row.requester_id,
            assigned_agent_id: row.assigned_agent_id,
            data,
            document_ids: self.load_documents(id)?,
            notes: self.load_notes(id)?,
            activities: self.load_activities(id)?,
            created_at: timestamp_from_ms(row.created_at)?,
            submitted_at: row.submitted_at.map(timestamp_from_ms).transpose()?,
            assigned_at: row.assigned_at.map(timestamp_from_ms).transpose()?,
            completed_at: row.completed_at.map(timestamp_from_ms).transpose()?,
        })
    }

    /// True when a request row exists. Used by the append paths so a missing
    /// request is `RequestNotFound` rather than a foreign-key error.
    pub(super) fn request_exists(&self, id: Uuid) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM requests WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        number: row.get(1)?,
        status: row.get(2)?,
        priority: row.get(3)?,
        service_id: row.get(4)?,
        organization_id: row.get(5)?,
        profile_id: row.get(6)?,
        requester_id: row.get(7)?,
        assigned_agent_id: row.get(8)?,
        data_json: row.get(9)?,
        created_at: row.get(10)?,
        submitted_at: row.get(11)?,
        assigned_at: row.get(12)?,
        completed_at: row.get(13)?,
    })
}
