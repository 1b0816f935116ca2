// Call Minutes - call-recording management core
//
// Imports or scans local call recordings, transcribes them through a remote
// ASR endpoint, turns transcripts into structured meeting minutes via a
// chat-completion endpoint, and synthesizes cross-meeting timeline briefs.

pub mod api_log;
pub mod controller;
pub mod database;
pub mod minutes;
pub mod paths;
pub mod pipeline;
pub mod remote;
pub mod repository;
pub mod scanner;

pub use controller::AppController;
pub use repository::CallRecordRepository;

use std::sync::Arc;

use api_log::ApiLogStore;
use database::DatabaseManager;
use paths::AppDirs;
use remote::{ApiKeyStore, StepFunClient};

/// Wire up a repository against the given directory layout and endpoint base.
///
/// The API key is read from the settings store on every outgoing call, so it
/// can be configured (or changed) at any time through the same store.
pub fn build_repository(dirs: &AppDirs, base_url: &str) -> anyhow::Result<Arc<CallRecordRepository>> {
    let db = Arc::new(DatabaseManager::new(dirs.database_path())?);
    let api_key = ApiKeyStore::new(db.clone());
    let client = Arc::new(StepFunClient::new(base_url, api_key));
    let api_log = ApiLogStore::new(dirs.api_log_dir()?);

    Ok(Arc::new(CallRecordRepository::new(db, client, api_log)))
}
