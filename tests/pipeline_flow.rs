// End-to-end pipeline test: import -> transcribe -> minute -> brief -> export,
// against a mock HTTP server and a temporary database.

use std::sync::Arc;

use call_minutes::api_log::ApiLogStore;
use call_minutes::database::{DatabaseManager, Priority, TranscriptStatus};
use call_minutes::minutes::ExportFormat;
use call_minutes::paths::AppDirs;
use call_minutes::remote::{ApiKeyStore, RetryPolicy, StepFunClient};
use call_minutes::CallRecordRepository;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn minute_response_body() -> serde_json::Value {
    // Fenced, with a trailing comma: exercises the tolerant decode.
    let content = "```json\n{\n  \"title\": \"项目交付沟通\",\n  \"summary\": \"双方确认了交付时间与验收标准。\",\n  \"keyPoints\": [\"确认交付时间\", \"明确验收标准\",],\n  \"participants\": [{\"name\": \"张三\", \"role\": null, \"speakerId\": \"Speaker 1\"}],\n  \"actionItems\": [{\"description\": \"发送验收清单\", \"assignee\": \"张三\", \"deadline\": null, \"priority\": \"HIGH\"}],\n  \"fullContent\": \"整理后的完整内容\"\n}\n```";
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
    })
}

fn brief_response_body() -> serde_json::Value {
    let content = r#"{
        "title": "项目推进脉络",
        "timelineNodes": [{"date": "2024-01-15 10:30", "summary": "首次确认交付时间"}],
        "trendAnalysis": "事件稳步推进。",
        "currentStatus": "等待验收。",
        "followUpSuggestions": ["跟进验收清单回执"]
    }"#;
    serde_json::json!({
        "id": "chatcmpl-2",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
    })
}

#[tokio::test]
async fn full_pipeline_against_mock_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "你好，关于项目交付时间，我们确认一下。"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(minute_response_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let workspace = tempdir().unwrap();
    let dirs = AppDirs::new(workspace.path().join("data"));
    let db = Arc::new(DatabaseManager::new(dirs.database_path()).unwrap());
    db.set_api_key("sk-integration-test").unwrap();

    let client = Arc::new(StepFunClient::new(server.uri(), ApiKeyStore::new(db.clone())));
    let repo = CallRecordRepository::new(
        db.clone(),
        client,
        ApiLogStore::new(dirs.api_log_dir().unwrap()),
    )
    .with_retry_policy(RetryPolicy {
        max_attempts: 3,
        backoff_unit: std::time::Duration::from_millis(1),
    });

    // Import a recording named in the recorder convention.
    let audio = workspace.path().join("张三_2401151030.m4a");
    std::fs::write(&audio, b"fake audio content").unwrap();
    let record = repo.import_audio_file(&audio, None).unwrap();
    assert_eq!(record.contact_name.as_deref(), Some("张三"));

    // Transcribe: the synthetic segment spans the whole text.
    let transcript = repo.transcribe_record(record.id).await.unwrap();
    assert_eq!(transcript.status, TranscriptStatus::Completed);
    assert_eq!(transcript.speakers.len(), 1);

    // Generate the minute through the fenced/trailing-comma response.
    let record = repo.get_record(record.id).unwrap().unwrap();
    let outcome = repo.generate_minute(&transcript, &record).await.unwrap();
    assert!(!outcome.is_fallback());
    let minute = outcome.into_inner();
    assert_eq!(minute.title, "项目交付沟通");
    assert_eq!(minute.key_points.len(), 2);
    assert_eq!(minute.action_items[0].priority, Priority::High);

    // The joined view carries the record's contact and capture time.
    let with_contact = repo.get_all_minutes_with_contact().unwrap();
    assert_eq!(with_contact.len(), 1);
    assert_eq!(with_contact[0].contact_name.as_deref(), Some("张三"));
    assert_eq!(with_contact[0].record_time, Some(record.record_time));

    // Timeline brief over the single minute.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(brief_response_body()))
        .mount(&server)
        .await;
    let brief = repo
        .generate_timeline_brief(with_contact)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(brief.title, "项目推进脉络");
    assert_eq!(brief.timeline_nodes.len(), 1);

    // Export the minute as Markdown.
    let export_dir = dirs.minutes_export_dir().unwrap();
    let exported = repo
        .export_minute_document(minute.id, ExportFormat::Markdown, &export_dir)
        .unwrap();
    let content = std::fs::read_to_string(exported).unwrap();
    assert!(content.starts_with("# 项目交付沟通"));

    // Diagnostic logs were written for each request/response pair.
    let log_entries = std::fs::read_dir(dirs.api_log_dir().unwrap())
        .unwrap()
        .count();
    assert!(log_entries >= 4);

    // Delete cascades through transcript and minute and removes the file.
    repo.delete_record(record.id).unwrap();
    assert!(!audio.exists());
    assert!(repo.get_all_minutes().unwrap().is_empty());
}

#[tokio::test]
async fn scan_twice_inserts_once() {
    let workspace = tempdir().unwrap();
    let dirs = AppDirs::new(workspace.path().join("data"));
    let db = Arc::new(DatabaseManager::new(dirs.database_path()).unwrap());

    let client = Arc::new(StepFunClient::new(
        "http://127.0.0.1:9",
        ApiKeyStore::new(db.clone()),
    ));
    let repo = CallRecordRepository::new(
        db,
        client,
        ApiLogStore::new(dirs.api_log_dir().unwrap()),
    );

    let recordings = dirs.data_dir().join("Recordings");
    std::fs::create_dir_all(&recordings).unwrap();
    std::fs::write(recordings.join("张三_2401151030.m4a"), b"a").unwrap();
    std::fs::write(recordings.join("13800001234-2401161100.wav"), b"b").unwrap();

    // Scan only the workspace-local dir so the test never depends on the
    // machine's real music/download folders.
    let scan_dirs = vec![recordings];

    let first = repo.scan_recordings(&scan_dirs).unwrap();
    assert_eq!(first.total_found, 2);
    assert_eq!(first.newly_inserted, 2);

    let second = repo.scan_recordings(&scan_dirs).unwrap();
    assert_eq!(second.newly_inserted, 0);
}
