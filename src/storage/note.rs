//! Note storage: append and load request notes.
//!
//! Appends are plain row INSERTs. There is no update or delete path:
//! notes are immutable once written.

use rusqlite::params;
use uuid::Uuid;

use crate::model::{Note, NoteKind};

use super::{Result, Storage, StorageError, timestamp_from_ms};

impl Storage {
    /// Appends a note to a request.
    pub fn append_note(&self, request_id: Uuid, note: &Note) -> Result<()> {
        if !self.request_exists(request_id)? {
            return Err(StorageError::RequestNotFound(request_id.to_string()));
        }
        self.conn.execute(
            "INSERT INTO notes (request_id, kind, content, author_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                request_id.to_string(),
                note.kind.as_str(),
                &note.content,
                &note.author_id,
                note.created_at.as_millisecond(),
            ],
        )?;
        Ok(())
    }

    /// Loads a request's notes in append order.
    pub fn load_notes(&self, request_id: Uuid) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, content, author_id, created_at
             FROM notes WHERE request_id = ?1 ORDER BY id",
        )?;
        let rows: Vec<(String, String, Option<String>, i64)> = stmt
            .query_map(params![request_id.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter()
            .map(|(kind, content, author_id, created_at)| {
                Ok(Note {
                    kind: NoteKind::parse(&kind)
                        .ok_or_else(|| StorageError::Corrupt(format!("unknown note kind: {kind}")))?,
                    content,
                    author_id,
                    created_at: timestamp_from_ms(created_at)?,
                })
            })
            .collect()
    }
}
