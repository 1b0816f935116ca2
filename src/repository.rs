// Call record repository for Call Minutes
// Orchestrates the store, the remote API and the filesystem: scan, import,
// transcribe, generate minutes, synthesize timeline briefs, delete.

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api_log::ApiLogStore;
use crate::database::{
    CallRecord, DatabaseManager, MeetingMinute, MinuteWithContact, SpeakerSegment, Transcript,
    TranscriptStatus,
};
use crate::minutes::export::{export_minute, ExportFormat};
use crate::minutes::parser::{self, DecodeOutcome, TimelineBrief};
use crate::minutes::prompts;
use crate::remote::{ChatRequest, RetryPolicy, SpeechApi, CHAT_MODEL};
use crate::scanner::{self, ScanSummary, StoreContactLookup};

/// Upload size limit mirroring the upstream API constraint. Files over this
/// are rejected before any network call.
pub const MAX_UPLOAD_BYTES: i64 = 25 * 1024 * 1024;

pub struct CallRecordRepository {
    db: Arc<DatabaseManager>,
    api: Arc<dyn SpeechApi>,
    api_log: ApiLogStore,
    retry: RetryPolicy,
}

impl CallRecordRepository {
    pub fn new(db: Arc<DatabaseManager>, api: Arc<dyn SpeechApi>, api_log: ApiLogStore) -> Self {
        Self {
            db,
            api,
            api_log,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the transport retry policy (tests use millisecond backoffs).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn db(&self) -> &Arc<DatabaseManager> {
        &self.db
    }

    // ===== Listing and search (store pass-throughs) =====

    pub fn get_all_records(&self) -> Result<Vec<CallRecord>> {
        self.db.get_all_records()
    }

    pub fn get_record(&self, record_id: i64) -> Result<Option<CallRecord>> {
        self.db.get_record(record_id)
    }

    pub fn search_records(&self, query: &str) -> Result<Vec<CallRecord>> {
        self.db.search_records(query)
    }

    pub fn get_transcript(&self, transcript_id: i64) -> Result<Option<Transcript>> {
        self.db.get_transcript(transcript_id)
    }

    pub fn get_transcript_by_record(&self, record_id: i64) -> Result<Option<Transcript>> {
        self.db.get_transcript_by_record(record_id)
    }

    pub fn get_minute_by_transcript(&self, transcript_id: i64) -> Result<Option<MeetingMinute>> {
        self.db.get_minute_by_transcript(transcript_id)
    }

    pub fn get_all_minutes(&self) -> Result<Vec<MeetingMinute>> {
        self.db.get_all_minutes()
    }

    pub fn get_all_minutes_with_contact(&self) -> Result<Vec<MinuteWithContact>> {
        self.db.get_all_minutes_with_contact()
    }

    pub fn search_minutes(&self, query: &str) -> Result<Vec<MeetingMinute>> {
        self.db.search_minutes(query)
    }

    pub fn delete_minute(&self, minute_id: i64) -> Result<()> {
        self.db.delete_minute(minute_id)
    }

    pub fn delete_minute_by_transcript(&self, transcript_id: i64) -> Result<()> {
        self.db.delete_minute_by_transcript(transcript_id)
    }

    // ===== Discovery and import =====

    /// Scan the candidate directories and persist newly discovered recordings.
    pub fn scan_recordings(&self, scan_dirs: &[PathBuf]) -> Result<ScanSummary> {
        let contacts = StoreContactLookup::new(self.db.clone());
        scanner::scan_recordings(&self.db, scan_dirs, &contacts)
    }

    /// Import one audio file explicitly. No de-duplication; an optional
    /// contact override wins over the parsed name.
    pub fn import_audio_file(
        &self,
        path: &Path,
        contact_override: Option<&str>,
    ) -> Result<CallRecord> {
        info!("Importing audio file {}", path.display());
        if !path.is_file() {
            bail!("File does not exist: {}", path.display());
        }

        let contacts = StoreContactLookup::new(self.db.clone());
        let mut record = scanner::record_from_file(path, &contacts)?;
        if let Some(name) = contact_override {
            record.contact_name = Some(name.to_string());
        }

        let id = self.db.insert_record(&record)?;
        info!("Imported {} as record {}", record.file_name, id);
        self.db
            .get_record(id)?
            .context("Imported record vanished from the store")
    }

    /// Delete a record, its audio file and its transcript/minute chain.
    pub fn delete_record(&self, record_id: i64) -> Result<()> {
        let record = self
            .db
            .get_record(record_id)?
            .context("Record not found")?;

        let path = Path::new(&record.file_path);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Could not remove audio file {}: {}", record.file_path, e);
            }
        }

        if let Some(transcript) = self.db.get_transcript_by_record(record.id)? {
            self.db.delete_minute_by_transcript(transcript.id)?;
        }
        self.db.delete_transcript_by_record(record.id)?;
        self.db.delete_record_row(record.id)?;

        info!("Deleted record {} ({})", record.id, record.file_name);
        Ok(())
    }

    /// Bulk-rename the contact for every record with this phone number.
    pub fn update_contact_name(&self, phone_number: &str, new_name: &str) -> Result<usize> {
        let updated = self.db.update_contact_name_by_phone(phone_number, new_name)?;
        info!(
            "Renamed contact for {} record(s) with number {}",
            updated, phone_number
        );
        Ok(updated)
    }

    /// Replace a transcript's text after user editing. The segment list is
    /// collapsed into a single "Edited" segment.
    pub fn update_transcript_text(&self, transcript_id: i64, edited_text: &str) -> Result<Transcript> {
        let transcript = self
            .db
            .get_transcript(transcript_id)?
            .context("Transcript not found")?;

        let speakers = vec![SpeakerSegment {
            speaker: "Edited".to_string(),
            text: edited_text.to_string(),
            start_time: 0.0,
            end_time: 0.0,
        }];
        self.db
            .update_transcript(transcript_id, edited_text, &speakers, transcript.status)?;

        self.db
            .get_transcript(transcript_id)?
            .context("Transcript vanished after update")
    }

    // ===== Transcription =====

    /// Transcribe one record through the remote ASR endpoint.
    ///
    /// A Processing transcript row is created before the upload so partial
    /// failures are observable; every failure path marks it Failed.
    pub async fn transcribe_record(&self, record_id: i64) -> Result<Transcript> {
        let record = self
            .db
            .get_record(record_id)?
            .context("Record not found")?;
        info!("Transcribing record {} ({})", record.id, record.file_name);

        let path = Path::new(&record.file_path);
        if !path.is_file() {
            bail!("Recording file does not exist: {}", record.file_path);
        }

        let file_size = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", record.file_path))?
            .len() as i64;
        if file_size > MAX_UPLOAD_BYTES {
            bail!(
                "File too large ({:.1} MB); the transcription API accepts at most 25 MB",
                file_size as f64 / (1024.0 * 1024.0)
            );
        }

        self.api_log.save(
            "transcribe_request",
            &format!(
                "Record id: {}\nFile: {}\nSize: {} bytes",
                record.id, record.file_name, file_size
            ),
        );

        let transcript_id =
            self.db
                .insert_transcript(record.id, "", &[], TranscriptStatus::Processing)?;

        let result = self
            .retry
            .run("transcribe", || self.api.transcribe_file(path))
            .await;

        match result {
            Ok(asr) => {
                info!(
                    "Transcription succeeded for record {}: {} chars",
                    record.id,
                    asr.text.chars().count()
                );
                self.api_log.save(
                    "transcribe_response",
                    &format!("Record id: {}\nText:\n{}", record.id, asr.text),
                );

                // step-asr does not diarize; wrap the whole text as one segment.
                let speakers = vec![SpeakerSegment {
                    speaker: "Speaker 1".to_string(),
                    text: asr.text.clone(),
                    start_time: 0.0,
                    end_time: 0.0,
                }];
                self.db.update_transcript(
                    transcript_id,
                    &asr.text,
                    &speakers,
                    TranscriptStatus::Completed,
                )?;
                self.db.mark_record_transcribed(record.id, transcript_id)?;

                self.db
                    .get_transcript(transcript_id)?
                    .context("Transcript vanished after update")
            }
            Err(e) => {
                error!("Transcription failed for record {}: {}", record.id, e);
                self.api_log.save(
                    "transcribe_error",
                    &format!("Record id: {}\nError: {}", record.id, e),
                );
                self.db
                    .update_transcript_status(transcript_id, TranscriptStatus::Failed)?;
                Err(anyhow::Error::new(e).context("Transcription failed"))
            }
        }
    }

    // ===== Minute generation =====

    /// Generate a meeting minute for a completed transcript and persist it.
    /// Response-shape failures never error; the tagged outcome tells callers
    /// whether real content or the placeholder was stored.
    pub async fn generate_minute(
        &self,
        transcript: &Transcript,
        record: &CallRecord,
    ) -> Result<DecodeOutcome<MeetingMinute>> {
        info!(
            "Generating minute for transcript {} ({} chars)",
            transcript.id,
            transcript.full_text.chars().count()
        );

        let prompt = prompts::build_minute_prompt(transcript, record);
        self.api_log.save(
            "minute_request",
            &format!("Transcript id: {}\nPrompt:\n{}", transcript.id, prompt),
        );

        let request = ChatRequest::with_system_and_user(
            CHAT_MODEL,
            prompts::MINUTE_SYSTEM_PROMPT.to_string(),
            prompt,
        );

        let response = match self
            .retry
            .run("generate_minute", || self.api.chat_completion(&request))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Minute generation failed for transcript {}: {}", transcript.id, e);
                self.api_log.save(
                    "minute_error",
                    &format!("Transcript id: {}\nError: {}", transcript.id, e),
                );
                return Err(anyhow::Error::new(e).context("Minute generation failed"));
            }
        };

        let content = response
            .first_content()
            .context("Empty response from LLM")?
            .to_string();
        self.api_log.save(
            "minute_response",
            &format!("Transcript id: {}\nContent:\n{}", transcript.id, content),
        );

        let outcome = parser::parse_minute_content(&content);
        let used_fallback = outcome.is_fallback();
        if used_fallback {
            warn!(
                "Minute response for transcript {} was not decodable JSON; storing fallback minute",
                transcript.id
            );
        }

        let new_minute = outcome.into_inner().into_new_minute(transcript.id);
        let minute_id = self.db.insert_minute(&new_minute)?;
        info!("Minute {} saved for transcript {}", minute_id, transcript.id);

        let minute = self
            .db
            .get_minute(minute_id)?
            .context("Minute vanished after insert")?;
        Ok(if used_fallback {
            DecodeOutcome::FallbackUsed(minute)
        } else {
            DecodeOutcome::Decoded(minute)
        })
    }

    /// Regenerate the minute for a record: drop any existing minute, then
    /// run generation against the record's completed transcript.
    pub async fn regenerate_minute_for_record(
        &self,
        record_id: i64,
    ) -> Result<DecodeOutcome<MeetingMinute>> {
        let record = self
            .db
            .get_record(record_id)?
            .context("Record not found")?;
        let transcript_id = record
            .transcript_id
            .context("Record has no transcript; transcribe it first")?;
        let transcript = self
            .db
            .get_transcript(transcript_id)?
            .context("Transcript not found")?;
        if transcript.status != TranscriptStatus::Completed {
            bail!("Transcript is not completed; cannot generate a minute");
        }

        self.db.delete_minute_by_transcript(transcript_id)?;
        self.generate_minute(&transcript, &record).await
    }

    /// Generate minutes for every transcribed record that has none yet.
    /// Returns the number generated; individual failures are logged.
    pub async fn regenerate_minutes_for_transcribed(&self) -> Result<usize> {
        let candidates: Vec<CallRecord> = self
            .db
            .get_all_records()?
            .into_iter()
            .filter(|r| r.is_transcribed && r.transcript_id.is_some())
            .collect();
        info!("Checking {} transcribed record(s) for missing minutes", candidates.len());

        let mut generated = 0;
        for record in candidates {
            let transcript_id = match record.transcript_id {
                Some(id) => id,
                None => continue,
            };
            if self.db.get_minute_by_transcript(transcript_id)?.is_some() {
                continue;
            }
            let transcript = match self.db.get_transcript(transcript_id)? {
                Some(t) if t.status == TranscriptStatus::Completed => t,
                _ => continue,
            };

            match self.generate_minute(&transcript, &record).await {
                Ok(_) => generated += 1,
                Err(e) => error!(
                    "Failed to generate minute for record {} ({}): {}",
                    record.id, record.file_name, e
                ),
            }
        }

        info!("Generated {} missing minute(s)", generated);
        Ok(generated)
    }

    // ===== Timeline brief =====

    /// Synthesize a chronological brief from several minutes. The input is
    /// sorted ascending by capture time (creation time as fallback) before
    /// prompt building; the model is asked to track progression in order.
    pub async fn generate_timeline_brief(
        &self,
        minutes: Vec<MinuteWithContact>,
    ) -> Result<DecodeOutcome<TimelineBrief>> {
        if minutes.is_empty() {
            bail!("No minutes selected for the timeline brief");
        }
        info!("Generating timeline brief from {} minute(s)", minutes.len());

        let sorted = prompts::sort_for_timeline(minutes);
        let prompt = prompts::build_timeline_prompt(&sorted);
        self.api_log.save(
            "timeline_request",
            &format!("Minutes: {}\nPrompt length: {}", sorted.len(), prompt.chars().count()),
        );

        let request = ChatRequest::with_system_and_user(
            CHAT_MODEL,
            prompts::TIMELINE_SYSTEM_PROMPT.to_string(),
            prompt,
        );

        let response = match self
            .retry
            .run("generate_timeline_brief", || self.api.chat_completion(&request))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Timeline brief generation failed: {}", e);
                self.api_log
                    .save("timeline_error", &format!("Error: {}", e));
                return Err(anyhow::Error::new(e).context("Timeline brief generation failed"));
            }
        };

        let content = response
            .first_content()
            .context("Empty response from LLM")?;
        self.api_log
            .save("timeline_response", &format!("Content:\n{}", content));

        let outcome = parser::parse_timeline_content(content);
        if outcome.is_fallback() {
            warn!("Timeline response was not decodable JSON; returning parse-failed brief");
        }
        Ok(outcome)
    }

    // ===== Export =====

    /// Render a minute into `export_dir` as Markdown or plain text.
    pub fn export_minute_document(
        &self,
        minute_id: i64,
        format: ExportFormat,
        export_dir: &Path,
    ) -> Result<PathBuf> {
        let minute = self
            .db
            .get_minute(minute_id)?
            .context("Minute not found")?;
        export_minute(export_dir, &minute, format)
    }
}
