// Database models - Call record
use serde::{Deserialize, Serialize};

/// A call recording entry: one audio file plus its extracted metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: i64,
    pub file_name: String,
    pub file_path: String,
    pub phone_number: Option<String>,
    pub contact_name: Option<String>,
    /// Duration in whole seconds (0 when the container could not be probed).
    pub duration_seconds: i64,
    /// File size in bytes.
    pub file_size: i64,
    /// Capture timestamp, epoch milliseconds.
    pub record_time: i64,
    /// Row creation timestamp, epoch milliseconds.
    pub create_time: i64,
    pub is_transcribed: bool,
    pub transcript_id: Option<i64>,
}

impl CallRecord {
    /// Display label: contact name, falling back to phone number, then file name.
    pub fn display_name(&self) -> &str {
        self.contact_name
            .as_deref()
            .or(self.phone_number.as_deref())
            .unwrap_or(&self.file_name)
    }

    /// De-duplication key: (contact-or-phone, capture time).
    pub fn dedup_key(&self) -> (Option<&str>, i64) {
        (
            self.contact_name.as_deref().or(self.phone_number.as_deref()),
            self.record_time,
        )
    }
}
