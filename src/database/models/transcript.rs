// Database models - Transcript
use serde::{Deserialize, Serialize};

/// Speech-to-text output for one call record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: i64,
    pub record_id: i64,
    pub full_text: String,
    /// Ordered speaker segments; stored as a JSON text column.
    pub speakers: Vec<SpeakerSegment>,
    pub status: TranscriptStatus,
    /// Epoch milliseconds.
    pub create_time: i64,
    pub update_time: i64,
}

/// One contiguous piece of speech attributed to a speaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub text: String,
    /// Offsets in seconds from the start of the recording.
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TranscriptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TranscriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::Pending => "PENDING",
            TranscriptStatus::Processing => "PROCESSING",
            TranscriptStatus::Completed => "COMPLETED",
            TranscriptStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "PROCESSING" => TranscriptStatus::Processing,
            "COMPLETED" => TranscriptStatus::Completed,
            "FAILED" => TranscriptStatus::Failed,
            _ => TranscriptStatus::Pending,
        }
    }
}

impl Transcript {
    /// Group segment texts by speaker, in first-appearance order, for prompt building.
    pub fn speaker_grouped_text(&self) -> String {
        let mut order: Vec<&str> = Vec::new();
        for seg in &self.speakers {
            if !order.contains(&seg.speaker.as_str()) {
                order.push(&seg.speaker);
            }
        }

        order
            .iter()
            .map(|speaker| {
                let lines: Vec<String> = self
                    .speakers
                    .iter()
                    .filter(|s| s.speaker == *speaker)
                    .map(|s| format!("  {}", s.text))
                    .collect();
                format!("{}:\n{}", speaker, lines.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TranscriptStatus::Pending,
            TranscriptStatus::Processing,
            TranscriptStatus::Completed,
            TranscriptStatus::Failed,
        ] {
            assert_eq!(TranscriptStatus::parse(status.as_str()), status);
        }
        assert_eq!(TranscriptStatus::parse("garbage"), TranscriptStatus::Pending);
    }

    #[test]
    fn test_speaker_grouped_text_keeps_first_appearance_order() {
        let transcript = Transcript {
            id: 1,
            record_id: 1,
            full_text: String::new(),
            speakers: vec![
                SpeakerSegment {
                    speaker: "Speaker 2".to_string(),
                    text: "hi".to_string(),
                    start_time: 0.0,
                    end_time: 1.0,
                },
                SpeakerSegment {
                    speaker: "Speaker 1".to_string(),
                    text: "hello".to_string(),
                    start_time: 1.0,
                    end_time: 2.0,
                },
                SpeakerSegment {
                    speaker: "Speaker 2".to_string(),
                    text: "bye".to_string(),
                    start_time: 2.0,
                    end_time: 3.0,
                },
            ],
            status: TranscriptStatus::Completed,
            create_time: 0,
            update_time: 0,
        };

        let grouped = transcript.speaker_grouped_text();
        assert_eq!(grouped, "Speaker 2:\n  hi\n  bye\n\nSpeaker 1:\n  hello");
    }
}
