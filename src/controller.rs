// Application controller for Call Minutes
// Aggregates reactive view state over the repository: record/minute lists,
// per-record pipeline stages, transient messages and the active-task flag.

use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

use crate::database::{CallRecord, MinuteWithContact};
use crate::minutes::TimelineBrief;
use crate::pipeline::{RecordStage, StageMap};
use crate::repository::CallRecordRepository;

/// View-state holder exposed to a frontend. Each piece of state is a watch
/// channel so a consumer observes the latest value without polling the store.
/// Cheap to clone; background tasks hold their own handle, so their lifetime
/// is independent of whichever caller started them.
#[derive(Clone)]
pub struct AppController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    repository: Arc<CallRecordRepository>,

    records_tx: watch::Sender<Vec<CallRecord>>,
    minutes_tx: watch::Sender<Vec<MinuteWithContact>>,
    stages_tx: watch::Sender<StageMap>,
    error_tx: watch::Sender<Option<String>>,
    success_tx: watch::Sender<Option<String>>,
    generating_brief_tx: watch::Sender<bool>,
}

impl AppController {
    pub fn new(repository: Arc<CallRecordRepository>) -> Self {
        let (records_tx, _) = watch::channel(Vec::new());
        let (minutes_tx, _) = watch::channel(Vec::new());
        let (stages_tx, _) = watch::channel(StageMap::new());
        let (error_tx, _) = watch::channel(None);
        let (success_tx, _) = watch::channel(None);
        let (generating_brief_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(ControllerInner {
                repository,
                records_tx,
                minutes_tx,
                stages_tx,
                error_tx,
                success_tx,
                generating_brief_tx,
            }),
        }
    }

    pub fn repository(&self) -> &Arc<CallRecordRepository> {
        &self.inner.repository
    }

    // ===== Observers =====

    pub fn records(&self) -> watch::Receiver<Vec<CallRecord>> {
        self.inner.records_tx.subscribe()
    }

    pub fn minutes(&self) -> watch::Receiver<Vec<MinuteWithContact>> {
        self.inner.minutes_tx.subscribe()
    }

    pub fn stages(&self) -> watch::Receiver<StageMap> {
        self.inner.stages_tx.subscribe()
    }

    pub fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.inner.error_tx.subscribe()
    }

    pub fn success_message(&self) -> watch::Receiver<Option<String>> {
        self.inner.success_tx.subscribe()
    }

    /// Whether any background task (transcription, minute generation or a
    /// timeline brief) is currently running.
    pub fn has_active_tasks(&self) -> bool {
        *self.inner.generating_brief_tx.borrow() || self.inner.stages_tx.borrow().any_active()
    }

    /// Reload both lists and reconcile resting stages from persisted facts.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Filter the record list by a search query (empty restores the full list).
    pub fn search_records(&self, query: &str) {
        let result = if query.trim().is_empty() {
            self.inner.repository.get_all_records()
        } else {
            self.inner.repository.search_records(query)
        };
        match result {
            Ok(records) => {
                let _ = self.inner.records_tx.send_replace(records);
            }
            Err(e) => self.inner.set_error(format!("Search failed: {}", e)),
        }
    }

    // ===== Background operations =====

    /// Transcribe a record and, when `chain_minute` is set, generate its
    /// minute right after. Runs as a detached task; the stage map records
    /// progress and survives the caller going away.
    pub fn transcribe_record(&self, record_id: i64, chain_minute: bool) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.run_transcription(record_id, chain_minute).await;
        });
    }

    /// Regenerate the minute for an already transcribed record as a
    /// detached background task.
    pub fn regenerate_minute(&self, record_id: i64) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.set_stage(record_id, RecordStage::GeneratingMinute);
            match inner.repository.regenerate_minute_for_record(record_id).await {
                Ok(outcome) => {
                    let minute = outcome.into_inner();
                    inner.set_stage(record_id, RecordStage::Completed);
                    inner.set_success(format!("Minute generated: {}", minute.title));
                    inner.refresh();
                }
                Err(e) => {
                    error!("Minute regeneration failed for record {}: {:#}", record_id, e);
                    inner.set_stage(record_id, RecordStage::MinuteFailed);
                    inner.set_error(format!("Minute generation failed: {:#}", e));
                }
            }
        });
    }

    /// Generate a timeline brief from the selected minutes as a detached
    /// background task; the result lands on the returned watch channel.
    pub fn generate_timeline_brief(
        &self,
        minutes: Vec<MinuteWithContact>,
    ) -> watch::Receiver<Option<TimelineBrief>> {
        let (result_tx, result_rx) = watch::channel(None);
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let _ = inner.generating_brief_tx.send_replace(true);
            match inner.repository.generate_timeline_brief(minutes).await {
                Ok(outcome) => {
                    let _ = result_tx.send_replace(Some(outcome.into_inner()));
                }
                Err(e) => {
                    error!("Timeline brief failed: {:#}", e);
                    inner.set_error(format!("Timeline brief failed: {:#}", e));
                }
            }
            let _ = inner.generating_brief_tx.send_replace(false);
        });
        result_rx
    }
}

impl ControllerInner {
    async fn run_transcription(&self, record_id: i64, chain_minute: bool) {
        self.set_stage(record_id, RecordStage::Transcribing);
        info!("Background transcription started for record {}", record_id);

        let transcript = match self.repository.transcribe_record(record_id).await {
            Ok(transcript) => {
                self.set_stage(record_id, RecordStage::TranscribeDone);
                self.refresh();
                transcript
            }
            Err(e) => {
                error!("Transcription failed for record {}: {:#}", record_id, e);
                self.set_stage(record_id, RecordStage::TranscribeFailed);
                self.set_error(format!("Transcription failed: {:#}", e));
                return;
            }
        };

        if !chain_minute {
            return;
        }

        self.set_stage(record_id, RecordStage::GeneratingMinute);
        let record = match self.repository.get_record(record_id) {
            Ok(Some(record)) => record,
            _ => {
                self.set_stage(record_id, RecordStage::MinuteFailed);
                return;
            }
        };

        match self.repository.generate_minute(&transcript, &record).await {
            Ok(outcome) => {
                let minute = outcome.into_inner();
                self.set_stage(record_id, RecordStage::Completed);
                self.set_success(format!("Minute generated: {}", minute.title));
                self.refresh();
            }
            Err(e) => {
                error!("Minute generation failed for record {}: {:#}", record_id, e);
                self.set_stage(record_id, RecordStage::MinuteFailed);
                self.set_error(format!("Minute generation failed: {:#}", e));
            }
        }
    }

    /// Reload both lists and recompute resting stages from persisted facts.
    /// Records whose stage is actively owned by a task are left untouched.
    fn refresh(&self) {
        match self.repository.get_all_records() {
            Ok(records) => {
                let facts: Vec<(i64, bool, bool)> = records
                    .iter()
                    .map(|r| {
                        let minute_exists = match r.transcript_id {
                            Some(tid) => self
                                .repository
                                .get_minute_by_transcript(tid)
                                .ok()
                                .flatten()
                                .is_some(),
                            None => false,
                        };
                        (r.id, r.is_transcribed, minute_exists)
                    })
                    .collect();

                self.stages_tx.send_modify(|stages| stages.reconcile(facts));
                let _ = self.records_tx.send_replace(records);
            }
            Err(e) => self.set_error(format!("Failed to load records: {}", e)),
        }

        match self.repository.get_all_minutes_with_contact() {
            Ok(minutes) => {
                let _ = self.minutes_tx.send_replace(minutes);
            }
            Err(e) => self.set_error(format!("Failed to load minutes: {}", e)),
        }
    }

    fn set_stage(&self, record_id: i64, stage: RecordStage) {
        self.stages_tx.send_modify(|stages| stages.set(record_id, stage));
    }

    fn set_error(&self, message: String) {
        let _ = self.error_tx.send_replace(Some(message));
    }

    fn set_success(&self, message: String) {
        let _ = self.success_tx.send_replace(Some(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_log::ApiLogStore;
    use crate::database::{DatabaseManager, TranscriptStatus};
    use crate::remote::models::{AsrResponse, ChatResponse};
    use crate::remote::{ApiError, ChatRequest, SpeechApi};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::tempdir;

    /// SpeechApi fake that always transcribes the same text and emits
    /// unparseable chat content (exercising the fallback minute path).
    struct CannedApi;

    #[async_trait]
    impl SpeechApi for CannedApi {
        async fn transcribe_file(&self, _path: &Path) -> Result<AsrResponse, ApiError> {
            Ok(AsrResponse {
                text: "固定文本".to_string(),
                segments: None,
                duration: None,
            })
        }

        async fn chat_completion(&self, _request: &ChatRequest) -> Result<ChatResponse, ApiError> {
            Ok(serde_json::from_value(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "not json"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
            }))
            .expect("valid canned response"))
        }
    }

    fn controller_fixture() -> (tempfile::TempDir, AppController) {
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseManager::new(dir.path().join("test.db")).unwrap());
        let repo = Arc::new(CallRecordRepository::new(
            db,
            Arc::new(CannedApi),
            ApiLogStore::new(dir.path().join("ApiLogs")),
        ));
        (dir, AppController::new(repo))
    }

    #[tokio::test]
    async fn test_refresh_reconciles_stages_from_persisted_facts() {
        let (dir, controller) = controller_fixture();

        let audio = dir.path().join("张三_2401151030.m4a");
        std::fs::write(&audio, b"x").unwrap();
        let record = controller
            .repository()
            .import_audio_file(&audio, None)
            .unwrap();

        controller.refresh();
        assert_eq!(
            controller.stages().borrow().get(record.id),
            Some(RecordStage::Idle)
        );

        // Transcribe synchronously through the repository, then refresh.
        controller
            .repository()
            .transcribe_record(record.id)
            .await
            .unwrap();
        controller.refresh();
        assert_eq!(
            controller.stages().borrow().get(record.id),
            Some(RecordStage::TranscribeDone)
        );

        // Minute present -> Completed.
        let transcript = controller
            .repository()
            .get_transcript_by_record(record.id)
            .unwrap()
            .unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Completed);
        let record_loaded = controller
            .repository()
            .get_record(record.id)
            .unwrap()
            .unwrap();
        controller
            .repository()
            .generate_minute(&transcript, &record_loaded)
            .await
            .unwrap();
        controller.refresh();
        assert_eq!(
            controller.stages().borrow().get(record.id),
            Some(RecordStage::Completed)
        );
        assert_eq!(controller.minutes().borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_does_not_clobber_active_stage() {
        let (dir, controller) = controller_fixture();

        let audio = dir.path().join("one_2401151030.mp3");
        std::fs::write(&audio, b"x").unwrap();
        let record = controller
            .repository()
            .import_audio_file(&audio, None)
            .unwrap();

        controller
            .inner
            .stages_tx
            .send_modify(|s| s.set(record.id, RecordStage::Transcribing));
        controller.refresh();

        assert_eq!(
            controller.stages().borrow().get(record.id),
            Some(RecordStage::Transcribing)
        );
        assert!(controller.has_active_tasks());
    }

    #[tokio::test]
    async fn test_search_records_filters_and_restores() {
        let (dir, controller) = controller_fixture();

        for name in ["张三_2401151030.m4a", "李四_2401161030.mp3"] {
            let audio = dir.path().join(name);
            std::fs::write(&audio, b"x").unwrap();
            controller
                .repository()
                .import_audio_file(&audio, None)
                .unwrap();
        }
        controller.refresh();
        assert_eq!(controller.records().borrow().len(), 2);

        controller.search_records("张三");
        assert_eq!(controller.records().borrow().len(), 1);

        controller.search_records("");
        assert_eq!(controller.records().borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_background_transcription_reaches_completed() {
        let (dir, controller) = controller_fixture();

        let audio = dir.path().join("bg_2401151030.mp3");
        std::fs::write(&audio, b"x").unwrap();
        let record = controller
            .repository()
            .import_audio_file(&audio, None)
            .unwrap();

        let mut stages = controller.stages();
        controller.transcribe_record(record.id, true);

        // Wait for the detached task to reach a terminal stage.
        loop {
            stages.changed().await.unwrap();
            let stage = stages.borrow().get(record.id);
            match stage {
                Some(RecordStage::Completed) => break,
                Some(RecordStage::TranscribeFailed) | Some(RecordStage::MinuteFailed) => {
                    panic!("pipeline failed: {:?}", stage)
                }
                _ => {}
            }
        }

        let record = controller
            .repository()
            .get_record(record.id)
            .unwrap()
            .unwrap();
        assert!(record.is_transcribed);
        assert!(controller.success_message().borrow().is_some());
    }
}
