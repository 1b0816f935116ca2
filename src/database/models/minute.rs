// Database models - Meeting minute
use serde::{Deserialize, Serialize};

/// Structured meeting-summary output derived from one transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingMinute {
    pub id: i64,
    pub transcript_id: i64,
    pub title: String,
    pub summary: String,
    /// Ordered key points; stored as a JSON text column.
    pub key_points: Vec<String>,
    pub participants: Vec<Participant>,
    pub action_items: Vec<ActionItem>,
    pub full_content: String,
    /// Epoch milliseconds.
    pub create_time: i64,
    pub update_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub name: String,
    pub role: Option<String>,
    pub speaker_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionItem {
    pub description: String,
    pub assignee: Option<String>,
    pub deadline: Option<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// Decode an LLM-supplied priority string. The model is constrained to
    /// HIGH/MEDIUM/LOW; anything else coerces to Medium.
    pub fn from_llm(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "HIGH" => Priority::High,
            "LOW" => Priority::Low,
            "MEDIUM" => Priority::Medium,
            _ => Priority::Medium,
        }
    }
}

/// A minute joined with its originating record's contact and capture metadata.
/// Produced by a LEFT JOIN query for grouped display; never persisted itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinuteWithContact {
    pub id: i64,
    pub transcript_id: i64,
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub participants: Vec<Participant>,
    pub action_items: Vec<ActionItem>,
    pub full_content: String,
    pub create_time: i64,
    pub update_time: i64,
    /// COALESCE(contact_name, phone_number) from the joined record.
    pub contact_name: Option<String>,
    pub record_time: Option<i64>,
    pub record_id: Option<i64>,
    pub record_file_name: Option<String>,
}

impl MinuteWithContact {
    /// Timeline ordering key: capture time, falling back to minute creation time.
    pub fn sort_time(&self) -> i64 {
        self.record_time.unwrap_or(self.create_time)
    }
}
