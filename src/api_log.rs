// Per-call API diagnostic logs for Call Minutes
// One file per request/response/error, independent of the primary persistence

use chrono::Local;
use std::path::PathBuf;

/// Writes one diagnostic file per API interaction into the ApiLogs dir.
///
/// Failures here are logged and swallowed: a broken log dir must never fail
/// the transcription or generation that produced the entry.
#[derive(Debug, Clone)]
pub struct ApiLogStore {
    dir: PathBuf,
}

impl ApiLogStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Save a log entry of the given kind (e.g. "transcribe_request").
    ///
    /// The file name is `{kind}_{epoch_millis}.txt` so entries sort by time.
    pub fn save(&self, kind: &str, content: &str) {
        let now = Local::now();
        let file_name = format!("{}_{}.txt", kind, now.timestamp_millis());
        let path = self.dir.join(file_name);

        let body = format!("Time: {}\n\n{}", now.format("%Y-%m-%d %H:%M:%S"), content);

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::warn!("Failed to create API log dir {}: {}", self.dir.display(), e);
            return;
        }
        match std::fs::write(&path, body) {
            Ok(()) => log::debug!("Saved API log: {}", path.display()),
            Err(e) => log::warn!("Failed to save API log {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_writes_one_file_per_entry() {
        let dir = tempdir().unwrap();
        let store = ApiLogStore::new(dir.path().join("ApiLogs"));

        store.save("transcribe_request", "record 1\nfile a.mp3");
        store.save("transcribe_response", "text: hello");

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("ApiLogs"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|n| n.starts_with("transcribe_request_")));
        assert!(entries.iter().any(|n| n.starts_with("transcribe_response_")));
    }

    #[test]
    fn test_save_never_panics_on_bad_dir() {
        // A file where the dir should be makes create_dir_all fail.
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "x").unwrap();

        let store = ApiLogStore::new(blocker);
        store.save("minute_request", "ignored");
    }
}
