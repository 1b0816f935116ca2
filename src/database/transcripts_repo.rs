// Transcripts repository for Call Minutes
// Handles CRUD operations for transcripts and their speaker segments

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::manager::now_millis;
use super::models::{SpeakerSegment, Transcript, TranscriptStatus};
use super::DatabaseManager;

impl DatabaseManager {
    /// Insert a new transcript row, returning its assigned id
    pub fn insert_transcript(
        &self,
        record_id: i64,
        full_text: &str,
        speakers: &[SpeakerSegment],
        status: TranscriptStatus,
    ) -> Result<i64> {
        self.with_connection(|conn| {
            insert_transcript_impl(conn, record_id, full_text, speakers, status)
        })
    }

    /// Get a transcript by id
    pub fn get_transcript(&self, id: i64) -> Result<Option<Transcript>> {
        self.with_connection(|conn| {
            get_transcript_where(conn, "id = ?1", params![id])
        })
    }

    /// Get the transcript belonging to a record
    pub fn get_transcript_by_record(&self, record_id: i64) -> Result<Option<Transcript>> {
        self.with_connection(|conn| {
            get_transcript_where(conn, "record_id = ?1", params![record_id])
        })
    }

    /// Replace a transcript's text, segments and status
    pub fn update_transcript(
        &self,
        id: i64,
        full_text: &str,
        speakers: &[SpeakerSegment],
        status: TranscriptStatus,
    ) -> Result<()> {
        let speakers_json =
            serde_json::to_string(speakers).context("Failed to encode speaker segments")?;
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE transcripts SET full_text = ?1, speakers = ?2, status = ?3, update_time = ?4 \
                 WHERE id = ?5",
                params![full_text, speakers_json, status.as_str(), now_millis(), id],
            )
            .context("Failed to update transcript")?;
            Ok(())
        })
    }

    /// Update only the status of a transcript
    pub fn update_transcript_status(&self, id: i64, status: TranscriptStatus) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE transcripts SET status = ?1, update_time = ?2 WHERE id = ?3",
                params![status.as_str(), now_millis(), id],
            )
            .context("Failed to update transcript status")?;
            Ok(())
        })
    }

    /// Delete the transcript belonging to a record
    pub fn delete_transcript_by_record(&self, record_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM transcripts WHERE record_id = ?1",
                params![record_id],
            )
            .context("Failed to delete transcript")?;
            Ok(())
        })
    }
}

fn insert_transcript_impl(
    conn: &Connection,
    record_id: i64,
    full_text: &str,
    speakers: &[SpeakerSegment],
    status: TranscriptStatus,
) -> Result<i64> {
    let speakers_json =
        serde_json::to_string(speakers).context("Failed to encode speaker segments")?;
    let now = now_millis();

    conn.execute(
        r#"
        INSERT INTO transcripts (record_id, full_text, speakers, status, create_time, update_time)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![record_id, full_text, speakers_json, status.as_str(), now, now],
    )
    .context("Failed to insert transcript")?;

    Ok(conn.last_insert_rowid())
}

fn get_transcript_where(
    conn: &Connection,
    predicate: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Transcript>> {
    let sql = format!(
        "SELECT id, record_id, full_text, speakers, status, create_time, update_time \
         FROM transcripts WHERE {}",
        predicate
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("Failed to prepare transcript query")?;

    let result = stmt.query_row(params, |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, i64>(6)?,
        ))
    });

    match result {
        Ok((id, record_id, full_text, speakers_json, status, create_time, update_time)) => {
            let speakers: Vec<SpeakerSegment> = serde_json::from_str(&speakers_json)
                .context("Failed to decode speaker segments")?;
            Ok(Some(Transcript {
                id,
                record_id,
                full_text,
                speakers,
                status: TranscriptStatus::parse(&status),
                create_time,
                update_time,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get transcript"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn segment(text: &str) -> SpeakerSegment {
        SpeakerSegment {
            speaker: "Speaker 1".to_string(),
            text: text.to_string(),
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    #[test]
    fn test_insert_and_get_transcript() {
        let db = create_test_db();

        let id = db
            .insert_transcript(42, "", &[], TranscriptStatus::Processing)
            .unwrap();

        let transcript = db.get_transcript(id).unwrap().unwrap();
        assert_eq!(transcript.record_id, 42);
        assert_eq!(transcript.status, TranscriptStatus::Processing);
        assert!(transcript.speakers.is_empty());

        let by_record = db.get_transcript_by_record(42).unwrap().unwrap();
        assert_eq!(by_record.id, id);
    }

    #[test]
    fn test_update_transcript_round_trips_segments() {
        let db = create_test_db();

        let id = db
            .insert_transcript(1, "", &[], TranscriptStatus::Processing)
            .unwrap();
        db.update_transcript(id, "你好，世界", &[segment("你好，世界")], TranscriptStatus::Completed)
            .unwrap();

        let transcript = db.get_transcript(id).unwrap().unwrap();
        assert_eq!(transcript.full_text, "你好，世界");
        assert_eq!(transcript.status, TranscriptStatus::Completed);
        assert_eq!(transcript.speakers, vec![segment("你好，世界")]);
    }

    #[test]
    fn test_status_only_update_keeps_text() {
        let db = create_test_db();

        let id = db
            .insert_transcript(1, "text", &[segment("text")], TranscriptStatus::Processing)
            .unwrap();
        db.update_transcript_status(id, TranscriptStatus::Failed).unwrap();

        let transcript = db.get_transcript(id).unwrap().unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Failed);
        assert_eq!(transcript.full_text, "text");
    }

    #[test]
    fn test_delete_by_record() {
        let db = create_test_db();

        db.insert_transcript(9, "", &[], TranscriptStatus::Pending).unwrap();
        db.delete_transcript_by_record(9).unwrap();
        assert!(db.get_transcript_by_record(9).unwrap().is_none());
    }
}
