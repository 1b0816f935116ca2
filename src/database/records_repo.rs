// Call records repository for Call Minutes
// Handles CRUD operations for call recordings

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::manager::now_millis;
use super::models::CallRecord;
use super::DatabaseManager;

/// Field set for inserting a new record; the id and create_time are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewCallRecord {
    pub file_name: String,
    pub file_path: String,
    pub phone_number: Option<String>,
    pub contact_name: Option<String>,
    pub duration_seconds: i64,
    pub file_size: i64,
    pub record_time: i64,
}

impl DatabaseManager {
    /// Insert a new call record, returning its assigned id
    pub fn insert_record(&self, record: &NewCallRecord) -> Result<i64> {
        self.with_connection(|conn| insert_record_impl(conn, record))
    }

    /// Get a record by id
    pub fn get_record(&self, id: i64) -> Result<Option<CallRecord>> {
        self.with_connection(|conn| get_record_impl(conn, id))
    }

    /// Get all records, most recently captured first
    pub fn get_all_records(&self) -> Result<Vec<CallRecord>> {
        self.with_connection(|conn| query_records(conn, SELECT_ALL, []))
    }

    /// Get records that have not been transcribed yet
    pub fn get_untranscribed_records(&self) -> Result<Vec<CallRecord>> {
        self.with_connection(|conn| {
            query_records(
                conn,
                "SELECT id, file_name, file_path, phone_number, contact_name, duration_seconds, \
                 file_size, record_time, create_time, is_transcribed, transcript_id \
                 FROM call_records WHERE is_transcribed = 0 ORDER BY record_time DESC",
                [],
            )
        })
    }

    /// Search records by phone number, contact name or file name substring
    pub fn search_records(&self, query: &str) -> Result<Vec<CallRecord>> {
        let pattern = format!("%{}%", query);
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, file_name, file_path, phone_number, contact_name, duration_seconds, \
                     file_size, record_time, create_time, is_transcribed, transcript_id \
                     FROM call_records \
                     WHERE phone_number LIKE ?1 OR contact_name LIKE ?1 OR file_name LIKE ?1 \
                     ORDER BY record_time DESC",
                )
                .context("Failed to prepare search_records query")?;
            let rows = stmt
                .query_map(params![pattern], row_to_record)
                .context("Failed to query records")?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect records")
        })
    }

    /// Mark a record as transcribed and link its transcript
    pub fn mark_record_transcribed(&self, id: i64, transcript_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE call_records SET is_transcribed = 1, transcript_id = ?1 WHERE id = ?2",
                params![transcript_id, id],
            )
            .context("Failed to mark record transcribed")?;
            Ok(())
        })
    }

    /// Update the contact name for every record with the given phone number
    pub fn update_contact_name_by_phone(&self, phone_number: &str, new_name: &str) -> Result<usize> {
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE call_records SET contact_name = ?1 WHERE phone_number = ?2",
                    params![new_name, phone_number],
                )
                .context("Failed to update contact name")?;
            Ok(updated)
        })
    }

    /// Look up a contact name previously assigned to this phone number.
    /// Returns None when no record carries a name distinct from the number.
    pub fn contact_name_for_phone(&self, phone_number: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT contact_name FROM call_records \
                 WHERE phone_number = ?1 AND contact_name IS NOT NULL AND contact_name != ?1 \
                 ORDER BY create_time DESC LIMIT 1",
                params![phone_number],
                |row| row.get(0),
            );
            match result {
                Ok(name) => Ok(Some(name)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to look up contact name"),
            }
        })
    }

    /// Delete a record row by id
    pub fn delete_record_row(&self, id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM call_records WHERE id = ?1", params![id])
                .context("Failed to delete record")?;
            Ok(())
        })
    }
}

const SELECT_ALL: &str =
    "SELECT id, file_name, file_path, phone_number, contact_name, duration_seconds, \
     file_size, record_time, create_time, is_transcribed, transcript_id \
     FROM call_records ORDER BY record_time DESC";

fn insert_record_impl(conn: &Connection, record: &NewCallRecord) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO call_records (
            file_name, file_path, phone_number, contact_name,
            duration_seconds, file_size, record_time, create_time
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            record.file_name,
            record.file_path,
            record.phone_number,
            record.contact_name,
            record.duration_seconds,
            record.file_size,
            record.record_time,
            now_millis(),
        ],
    )
    .context("Failed to insert call record")?;

    Ok(conn.last_insert_rowid())
}

fn get_record_impl(conn: &Connection, id: i64) -> Result<Option<CallRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, file_name, file_path, phone_number, contact_name, duration_seconds, \
             file_size, record_time, create_time, is_transcribed, transcript_id \
             FROM call_records WHERE id = ?1",
        )
        .context("Failed to prepare get_record query")?;

    let result = stmt.query_row(params![id], row_to_record);

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get record"),
    }
}

fn query_records<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<CallRecord>> {
    let mut stmt = conn.prepare(sql).context("Failed to prepare records query")?;
    let rows = stmt
        .query_map(params, row_to_record)
        .context("Failed to query records")?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect records")
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallRecord> {
    Ok(CallRecord {
        id: row.get(0)?,
        file_name: row.get(1)?,
        file_path: row.get(2)?,
        phone_number: row.get(3)?,
        contact_name: row.get(4)?,
        duration_seconds: row.get(5)?,
        file_size: row.get(6)?,
        record_time: row.get(7)?,
        create_time: row.get(8)?,
        is_transcribed: row.get::<_, i64>(9)? != 0,
        transcript_id: row.get(10)?,
    })
}
