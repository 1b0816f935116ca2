// Application directory layout for Call Minutes
// Data dir, imported recordings, exported minutes, API logs, and scan candidates

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory layout under the application data dir.
///
/// Every path is created lazily by the accessor that needs it, so a read-only
/// operation never touches the filesystem.
#[derive(Debug, Clone)]
pub struct AppDirs {
    data_dir: PathBuf,
}

impl AppDirs {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Default layout under the platform data dir (e.g. ~/.local/share/call-minutes).
    pub fn default_dirs() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("call-minutes");
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("callminutes.db")
    }

    /// Directory for audio files copied in by explicit import.
    pub fn imported_recordings_dir(&self) -> Result<PathBuf> {
        self.ensure_subdir("ImportedRecordings")
    }

    /// Directory for exported minute documents.
    pub fn minutes_export_dir(&self) -> Result<PathBuf> {
        self.ensure_subdir("Minutes")
    }

    /// Directory for per-call API request/response log files.
    pub fn api_log_dir(&self) -> Result<PathBuf> {
        self.ensure_subdir("ApiLogs")
    }

    /// Fixed candidate directories searched by the recording scan.
    ///
    /// App-private dirs first, then the common user audio locations the
    /// recorder apps we know of write into. Nonexistent entries are skipped
    /// by the scanner.
    pub fn scan_dirs(&self) -> Vec<PathBuf> {
        let mut candidates = vec![
            self.data_dir.join("Recordings"),
            self.data_dir.join("CallRecordings"),
            self.data_dir.join("ImportedRecordings"),
        ];

        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join("Recordings"));
            candidates.push(home.join("CallRecordings"));
        }
        if let Some(audio) = dirs::audio_dir() {
            candidates.push(audio.join("Recordings"));
            candidates.push(audio.join("CallRecordings"));
        }
        if let Some(documents) = dirs::document_dir() {
            candidates.push(documents.join("Recordings"));
        }
        if let Some(downloads) = dirs::download_dir() {
            candidates.push(downloads.join("Recordings"));
        }

        candidates
    }

    fn ensure_subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.data_dir.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        Ok(dir)
    }
}
