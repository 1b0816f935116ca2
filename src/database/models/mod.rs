// Database models - Re-exports all domain-specific models
//
// This module is split into focused files by domain:
// - record.rs: Call recordings and their extracted metadata
// - transcript.rs: Transcripts and speaker segments
// - minute.rs: Meeting minutes and the contact-joined view

mod minute;
mod record;
mod transcript;

pub use minute::{ActionItem, MeetingMinute, MinuteWithContact, Participant, Priority};
pub use record::CallRecord;
pub use transcript::{SpeakerSegment, Transcript, TranscriptStatus};
