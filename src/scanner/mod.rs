// Recording discovery for Call Minutes
// Scans candidate directories, extracts metadata and de-duplicates against the store

pub mod filename;
pub mod media;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database::{DatabaseManager, NewCallRecord};

use filename::{is_phone_like, parse_file_name};

/// File extensions treated as call recordings.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "amr", "3gp", "aac", "ogg"];

/// Resolves a phone number to a display name.
///
/// The store-backed impl reuses names already assigned to the number; any
/// failure degrades to None so the raw number is used instead.
pub trait ContactLookup: Send + Sync {
    fn lookup(&self, phone_number: &str) -> Option<String>;
}

/// Lookup backed by previously named records in the store.
pub struct StoreContactLookup {
    db: Arc<DatabaseManager>,
}

impl StoreContactLookup {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

impl ContactLookup for StoreContactLookup {
    fn lookup(&self, phone_number: &str) -> Option<String> {
        match self.db.contact_name_for_phone(phone_number) {
            Ok(name) => name,
            Err(e) => {
                log::warn!("Contact lookup failed for {}: {}", phone_number, e);
                None
            }
        }
    }
}

/// Lookup that never resolves anything.
pub struct NoContacts;

impl ContactLookup for NoContacts {
    fn lookup(&self, _phone_number: &str) -> Option<String> {
        None
    }
}

/// Outcome of one directory scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub total_found: usize,
    pub newly_inserted: usize,
}

/// Build a candidate record from an audio file on disk.
///
/// Duration comes from the container header (0 on failure); contact/phone and
/// capture time come from the file name, with the file's modified time as the
/// capture-time fallback.
pub fn record_from_file(path: &Path, contacts: &dyn ContactLookup) -> Result<NewCallRecord> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let duration_seconds = media::probe_duration_seconds(path);
    let parsed = parse_file_name(&file_name);

    let (phone_number, contact_name) = match parsed.token {
        Some(token) if is_phone_like(&token) => {
            let name = contacts.lookup(&token).unwrap_or_else(|| token.clone());
            (Some(token), Some(name))
        }
        Some(token) => (None, Some(token)),
        None => (None, None),
    };

    let record_time = match parsed.record_time {
        Some(millis) => millis,
        None => file_modified_millis(&metadata),
    };

    Ok(NewCallRecord {
        file_name,
        file_path: path.to_string_lossy().to_string(),
        phone_number,
        contact_name,
        duration_seconds,
        file_size: metadata.len() as i64,
        record_time,
    })
}

/// Scan the candidate directories for recordings and persist the new ones.
///
/// A candidate is a duplicate when (contact-or-phone, capture time) matches
/// an existing record exactly. Nonexistent directories are skipped; a failing
/// directory enumeration fails the whole scan.
pub fn scan_recordings(
    db: &DatabaseManager,
    scan_dirs: &[PathBuf],
    contacts: &dyn ContactLookup,
) -> Result<ScanSummary> {
    log::info!("Scanning {} candidate directories", scan_dirs.len());
    let mut found: Vec<NewCallRecord> = Vec::new();

    for dir in scan_dirs {
        if !dir.is_dir() {
            log::debug!("Skipping nonexistent scan dir {}", dir.display());
            continue;
        }

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to enumerate {}", dir.display()))?;

        for entry in entries {
            let entry =
                entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            if !path.is_file() || !has_audio_extension(&path) {
                continue;
            }

            match record_from_file(&path, contacts) {
                Ok(record) => {
                    log::debug!("Found recording {}", record.file_name);
                    found.push(record);
                }
                Err(e) => log::warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }
    }

    let existing_keys: HashSet<(Option<String>, i64)> = db
        .get_all_records()?
        .into_iter()
        .map(|r| (r.contact_name.or(r.phone_number), r.record_time))
        .collect();

    let mut newly_inserted = 0;
    for record in &found {
        let key = (
            record
                .contact_name
                .clone()
                .or_else(|| record.phone_number.clone()),
            record.record_time,
        );
        if existing_keys.contains(&key) {
            continue;
        }
        db.insert_record(record)?;
        newly_inserted += 1;
    }

    log::info!(
        "Scan complete: {} found, {} newly inserted",
        found.len(),
        newly_inserted
    );

    Ok(ScanSummary {
        total_found: found.len(),
        newly_inserted,
    })
}

fn file_modified_millis(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
