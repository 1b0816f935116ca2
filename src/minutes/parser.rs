// Tolerant decoding of LLM JSON output
// Strict decode after repair; undecodable content degrades to an explicit
// fallback value instead of an error, tagged so callers can tell the two apart.

use serde::{Deserialize, Serialize};

use crate::database::{ActionItem, NewMinute, Participant, Priority};

/// Result of a tolerant decode: either real model content or the synthetic
/// placeholder built from the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome<T> {
    Decoded(T),
    FallbackUsed(T),
}

impl<T> DecodeOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DecodeOutcome::FallbackUsed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            DecodeOutcome::Decoded(v) | DecodeOutcome::FallbackUsed(v) => v,
        }
    }
}

/// Minute JSON emitted by the model (camelCase keys per the prompt schema).
/// Every field defaults so partially valid objects still decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MinutePayload {
    pub title: String,
    pub summary: String,
    #[serde(rename = "keyPoints")]
    pub key_points: Vec<String>,
    pub participants: Vec<ParticipantPayload>,
    #[serde(rename = "actionItems")]
    pub action_items: Vec<ActionItemPayload>,
    #[serde(rename = "fullContent")]
    pub full_content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParticipantPayload {
    pub name: String,
    pub role: Option<String>,
    #[serde(rename = "speakerId")]
    pub speaker_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionItemPayload {
    pub description: String,
    pub assignee: Option<String>,
    pub deadline: Option<String>,
    /// Left as text here; out-of-range values coerce to Medium on conversion.
    pub priority: String,
}

impl MinutePayload {
    /// Convert to the persistable minute shape, coercing priorities.
    pub fn into_new_minute(self, transcript_id: i64) -> NewMinute {
        NewMinute {
            transcript_id,
            title: self.title,
            summary: self.summary,
            key_points: self.key_points,
            participants: self
                .participants
                .into_iter()
                .map(|p| Participant {
                    name: p.name,
                    role: p.role,
                    speaker_id: p.speaker_id,
                })
                .collect(),
            action_items: self
                .action_items
                .into_iter()
                .map(|item| ActionItem {
                    description: item.description,
                    assignee: item.assignee,
                    deadline: item.deadline,
                    priority: Priority::from_llm(&item.priority),
                })
                .collect(),
            full_content: self.full_content,
        }
    }
}

/// Timeline brief emitted by the model; also the value handed back to
/// callers (it is never persisted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineBrief {
    pub title: String,
    #[serde(rename = "timelineNodes")]
    pub timeline_nodes: Vec<TimelineNode>,
    #[serde(rename = "trendAnalysis")]
    pub trend_analysis: String,
    #[serde(rename = "currentStatus")]
    pub current_status: String,
    #[serde(rename = "followUpSuggestions")]
    pub follow_up_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineNode {
    pub date: String,
    pub summary: String,
}

/// Decode minute content; never fails. The fallback minute carries the raw
/// text so nothing the model said is lost.
pub fn parse_minute_content(content: &str) -> DecodeOutcome<MinutePayload> {
    match serde_json::from_str::<MinutePayload>(&repair_json(content)) {
        Ok(payload) => DecodeOutcome::Decoded(payload),
        Err(e) => {
            log::warn!("Minute JSON undecodable after repair: {}", e);
            DecodeOutcome::FallbackUsed(MinutePayload {
                title: "会谈纪要".to_string(),
                summary: truncate_chars(content, 200),
                key_points: vec!["详见完整内容".to_string()],
                participants: Vec::new(),
                action_items: Vec::new(),
                full_content: content.to_string(),
            })
        }
    }
}

/// Decode a timeline brief; never fails. The fallback is an explicit
/// parse-failed brief with an empty timeline.
pub fn parse_timeline_content(content: &str) -> DecodeOutcome<TimelineBrief> {
    match serde_json::from_str::<TimelineBrief>(&repair_json(content)) {
        Ok(brief) => DecodeOutcome::Decoded(brief),
        Err(e) => {
            log::warn!("Timeline JSON undecodable after repair: {}", e);
            DecodeOutcome::FallbackUsed(TimelineBrief {
                title: "事件脉络简报（解析异常）".to_string(),
                timeline_nodes: Vec::new(),
                trend_analysis: truncate_chars(content, 300),
                current_status: "JSON解析失败，请重试".to_string(),
                follow_up_suggestions: vec!["建议重新选择纪要并生成简报".to_string()],
            })
        }
    }
}

/// The repair pipeline applied before the strict decode: strip code fences,
/// cut to the outermost braces, drop trailing commas.
pub fn repair_json(content: &str) -> String {
    let cleaned = strip_code_fence(content);
    let extracted = extract_json_object(cleaned);
    fix_trailing_commas(extracted)
}

/// Remove a wrapping ```json ... ``` (or bare ```) fence if present.
pub fn strip_code_fence(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }
    s
}

/// The substring between the first '{' and the last '}', inclusive; the
/// input unchanged when no such pair exists.
pub fn extract_json_object(content: &str) -> &str {
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => content,
    }
}

/// Remove commas immediately (modulo whitespace) before a closing '}' or ']'.
/// Scans character-by-character with string/escape state so commas inside
/// quoted values are never touched.
pub fn fix_trailing_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escape = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if escape {
            out.push(c);
            escape = false;
            i += 1;
            continue;
        }
        if c == '\\' {
            out.push(c);
            escape = true;
            i += 1;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            out.push(c);
            i += 1;
            continue;
        }
        if !in_string && c == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}

/// First `max` characters of a string, on char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
