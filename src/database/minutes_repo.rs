// Meeting minutes repository for Call Minutes
// Handles CRUD for minutes plus the contact-joined display view

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::manager::now_millis;
use super::models::{ActionItem, MeetingMinute, MinuteWithContact, Participant};
use super::DatabaseManager;

/// Field set for inserting a new minute; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMinute {
    pub transcript_id: i64,
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub participants: Vec<Participant>,
    pub action_items: Vec<ActionItem>,
    pub full_content: String,
}

impl DatabaseManager {
    /// Insert a new minute, returning its assigned id
    pub fn insert_minute(&self, minute: &NewMinute) -> Result<i64> {
        self.with_connection(|conn| insert_minute_impl(conn, minute))
    }

    /// Get a minute by id
    pub fn get_minute(&self, id: i64) -> Result<Option<MeetingMinute>> {
        self.with_connection(|conn| get_minute_where(conn, "id = ?1", params![id]))
    }

    /// Get the minute belonging to a transcript
    pub fn get_minute_by_transcript(&self, transcript_id: i64) -> Result<Option<MeetingMinute>> {
        self.with_connection(|conn| {
            get_minute_where(conn, "transcript_id = ?1", params![transcript_id])
        })
    }

    /// Get all minutes, newest first
    pub fn get_all_minutes(&self) -> Result<Vec<MeetingMinute>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM meeting_minutes ORDER BY create_time DESC",
                    MINUTE_COLUMNS
                ))
                .context("Failed to prepare get_all_minutes query")?;
            let rows = stmt
                .query_map([], row_to_minute)
                .context("Failed to query minutes")?;
            collect_minutes(rows)
        })
    }

    /// Search minutes by title or summary substring
    pub fn search_minutes(&self, query: &str) -> Result<Vec<MeetingMinute>> {
        let pattern = format!("%{}%", query);
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM meeting_minutes \
                     WHERE title LIKE ?1 OR summary LIKE ?1 ORDER BY create_time DESC",
                    MINUTE_COLUMNS
                ))
                .context("Failed to prepare search_minutes query")?;
            let rows = stmt
                .query_map(params![pattern], row_to_minute)
                .context("Failed to query minutes")?;
            collect_minutes(rows)
        })
    }

    /// All minutes joined with their record's contact name, capture time and
    /// file name, newest capture first. Join chain:
    /// meeting_minutes.transcript_id -> transcripts.record_id -> call_records.
    pub fn get_all_minutes_with_contact(&self) -> Result<Vec<MinuteWithContact>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT m.id, m.transcript_id, m.title, m.summary, m.key_points, \
                            m.participants, m.action_items, m.full_content, m.create_time, m.update_time, \
                            COALESCE(r.contact_name, r.phone_number) AS contact_name, \
                            r.record_time, r.id, r.file_name \
                     FROM meeting_minutes m \
                     LEFT JOIN transcripts t ON m.transcript_id = t.id \
                     LEFT JOIN call_records r ON t.record_id = r.id \
                     ORDER BY COALESCE(r.record_time, m.create_time) DESC",
                )
                .context("Failed to prepare minutes_with_contact query")?;

            let rows = stmt
                .query_map([], |row| {
                    let minute = row_to_minute(row)?;
                    Ok(MinuteWithContact {
                        id: minute.id,
                        transcript_id: minute.transcript_id,
                        title: minute.title,
                        summary: minute.summary,
                        key_points: minute.key_points,
                        participants: minute.participants,
                        action_items: minute.action_items,
                        full_content: minute.full_content,
                        create_time: minute.create_time,
                        update_time: minute.update_time,
                        contact_name: row.get(10)?,
                        record_time: row.get(11)?,
                        record_id: row.get(12)?,
                        record_file_name: row.get(13)?,
                    })
                })
                .context("Failed to query minutes with contact")?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect minutes with contact")
        })
    }

    /// Delete a minute by id
    pub fn delete_minute(&self, id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM meeting_minutes WHERE id = ?1", params![id])
                .context("Failed to delete minute")?;
            Ok(())
        })
    }

    /// Delete the minute belonging to a transcript (used before regeneration)
    pub fn delete_minute_by_transcript(&self, transcript_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM meeting_minutes WHERE transcript_id = ?1",
                params![transcript_id],
            )
            .context("Failed to delete minute by transcript")?;
            Ok(())
        })
    }
}

const MINUTE_COLUMNS: &str =
    "id, transcript_id, title, summary, key_points, participants, action_items, \
     full_content, create_time, update_time";

fn insert_minute_impl(conn: &Connection, minute: &NewMinute) -> Result<i64> {
    let key_points =
        serde_json::to_string(&minute.key_points).context("Failed to encode key points")?;
    let participants =
        serde_json::to_string(&minute.participants).context("Failed to encode participants")?;
    let action_items =
        serde_json::to_string(&minute.action_items).context("Failed to encode action items")?;
    let now = now_millis();

    conn.execute(
        r#"
        INSERT INTO meeting_minutes (
            transcript_id, title, summary, key_points, participants,
            action_items, full_content, create_time, update_time
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            minute.transcript_id,
            minute.title,
            minute.summary,
            key_points,
            participants,
            action_items,
            minute.full_content,
            now,
            now,
        ],
    )
    .context("Failed to insert minute")?;

    Ok(conn.last_insert_rowid())
}

fn get_minute_where(
    conn: &Connection,
    predicate: &str,
    params: impl rusqlite::Params,
) -> Result<Option<MeetingMinute>> {
    let sql = format!(
        "SELECT {} FROM meeting_minutes WHERE {}",
        MINUTE_COLUMNS, predicate
    );
    let mut stmt = conn.prepare(&sql).context("Failed to prepare minute query")?;

    let result = stmt.query_row(params, row_to_minute);
    match result {
        Ok(minute) => Ok(Some(minute)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get minute"),
    }
}

/// Decode a minute row; JSON columns decode inside the rusqlite row mapper so
/// a corrupt column surfaces as a row error, not a panic.
fn row_to_minute(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingMinute> {
    let key_points_json: String = row.get(4)?;
    let participants_json: String = row.get(5)?;
    let action_items_json: String = row.get(6)?;

    Ok(MeetingMinute {
        id: row.get(0)?,
        transcript_id: row.get(1)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        key_points: decode_json_column(4, &key_points_json)?,
        participants: decode_json_column(5, &participants_json)?,
        action_items: decode_json_column(6, &action_items_json)?,
        full_content: row.get(7)?,
        create_time: row.get(8)?,
        update_time: row.get(9)?,
    })
}

fn decode_json_column<T: serde::de::DeserializeOwned>(
    index: usize,
    json: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn collect_minutes(
    rows: impl Iterator<Item = rusqlite::Result<MeetingMinute>>,
) -> Result<Vec<MeetingMinute>> {
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect minutes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Priority, TranscriptStatus};
    use crate::database::records_repo::NewCallRecord;
    use tempfile::tempdir;

    fn create_test_db() -> DatabaseManager {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = DatabaseManager::new(db_path).unwrap();
        // Keep the temp dir alive for the life of the process so SQLite's file
        // isn't unlinked out from under the open connection.
        let _ = dir.keep();
        db
    }

    fn new_minute(transcript_id: i64, title: &str) -> NewMinute {
        NewMinute {
            transcript_id,
            title: title.to_string(),
            summary: "summary".to_string(),
            key_points: vec!["point one".to_string()],
            participants: vec![Participant {
                name: "张三".to_string(),
                role: None,
                speaker_id: "Speaker 1".to_string(),
            }],
            action_items: vec![ActionItem {
                description: "follow up".to_string(),
                assignee: Some("张三".to_string()),
                deadline: None,
                priority: Priority::High,
            }],
            full_content: "full".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get_minute() {
        let db = create_test_db();

        let id = db.insert_minute(&new_minute(5, "会谈纪要")).unwrap();
        let minute = db.get_minute(id).unwrap().unwrap();

        assert_eq!(minute.transcript_id, 5);
        assert_eq!(minute.title, "会谈纪要");
        assert_eq!(minute.key_points, vec!["point one".to_string()]);
        assert_eq!(minute.action_items[0].priority, Priority::High);

        let by_transcript = db.get_minute_by_transcript(5).unwrap().unwrap();
        assert_eq!(by_transcript.id, id);
    }

    #[test]
    fn test_search_minutes() {
        let db = create_test_db();

        db.insert_minute(&new_minute(1, "项目进度讨论")).unwrap();
        db.insert_minute(&new_minute(2, "合同条款")).unwrap();

        assert_eq!(db.search_minutes("项目").unwrap().len(), 1);
        assert_eq!(db.search_minutes("summary").unwrap().len(), 2);
    }

    #[test]
    fn test_delete_minute_by_transcript() {
        let db = create_test_db();

        db.insert_minute(&new_minute(3, "t")).unwrap();
        db.delete_minute_by_transcript(3).unwrap();
        assert!(db.get_minute_by_transcript(3).unwrap().is_none());
    }

    #[test]
    fn test_minutes_with_contact_join() {
        let db = create_test_db();

        let record_id = db
            .insert_record(&NewCallRecord {
                file_name: "zhangsan_2401151030.mp3".to_string(),
                file_path: "/tmp/zhangsan_2401151030.mp3".to_string(),
                phone_number: Some("13800001234".to_string()),
                contact_name: Some("张三".to_string()),
                duration_seconds: 60,
                file_size: 1024,
                record_time: 12345,
            })
            .unwrap();
        let transcript_id = db
            .insert_transcript(record_id, "text", &[], TranscriptStatus::Completed)
            .unwrap();
        db.insert_minute(&new_minute(transcript_id, "joined")).unwrap();

        // A minute with no surviving record still appears, with null contact fields.
        db.insert_minute(&new_minute(999, "orphan")).unwrap();

        let joined = db.get_all_minutes_with_contact().unwrap();
        assert_eq!(joined.len(), 2);

        let with_record = joined.iter().find(|m| m.title == "joined").unwrap();
        assert_eq!(with_record.contact_name.as_deref(), Some("张三"));
        assert_eq!(with_record.record_time, Some(12345));
        assert_eq!(with_record.record_id, Some(record_id));
        assert_eq!(
            with_record.record_file_name.as_deref(),
            Some("zhangsan_2401151030.mp3")
        );

        let orphan = joined.iter().find(|m| m.title == "orphan").unwrap();
        assert!(orphan.contact_name.is_none());
        assert!(orphan.record_time.is_none());
    }
}
