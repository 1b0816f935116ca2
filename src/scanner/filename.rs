// Filename metadata heuristics for Call Minutes
// Recorder apps name files "<contact>_<yymmddHHMM>.<ext>" (or with '-'/' ').

use chrono::{Local, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Bare phone number patterns tried when no separator is present:
/// 11 consecutive digits, or 3-4-4 groups joined by '-' or spaces.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{11}|\d{3}-\d{4}-\d{4}|\d{3}\s\d{4}\s\d{4}").expect("invalid phone regex")
});

/// Result of parsing a recording file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFileName {
    /// The contact-or-phone token before the separator (or a bare phone
    /// number extracted from the whole stem).
    pub token: Option<String>,
    /// Capture timestamp decoded from the `yymmddHHMM` tail, epoch millis.
    pub record_time: Option<i64>,
}

/// Parse a file name of the form `<contact>_<yymmddHHMM>.<ext>`.
///
/// The split point is the LAST occurrence of '_', '-' or space, so contact
/// tokens may themselves contain separators. A tail that is not a valid
/// 10-digit timestamp leaves the token but no time. Without any separator,
/// a bare phone number is extracted from the whole stem if present.
pub fn parse_file_name(file_name: &str) -> ParsedFileName {
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };

    if let Some(sep_idx) = stem.rfind(|c| c == '_' || c == '-' || c == ' ') {
        if sep_idx > 0 {
            let token = stem[..sep_idx].trim();
            let time_part = stem[sep_idx + 1..].trim();

            let token = if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            };

            if let Some(millis) = decode_compact_timestamp(time_part) {
                log::debug!(
                    "Parsed file name {:?} -> token {:?}, time {}",
                    file_name,
                    token,
                    millis
                );
                return ParsedFileName {
                    token,
                    record_time: Some(millis),
                };
            }

            log::debug!(
                "Parsed file name {:?} -> token {:?} (no valid timestamp tail)",
                file_name,
                token
            );
            return ParsedFileName {
                token,
                record_time: None,
            };
        }
    }

    if let Some(phone) = PHONE_REGEX.find(stem) {
        log::debug!("Parsed file name {:?} -> bare phone {}", file_name, phone.as_str());
        return ParsedFileName {
            token: Some(phone.as_str().to_string()),
            record_time: None,
        };
    }

    log::debug!("Could not parse file name {:?}", file_name);
    ParsedFileName::default()
}

/// Whether a parsed token looks like a phone number rather than a name:
/// non-empty, only digits/hyphens/spaces, at least one digit.
pub fn is_phone_like(token: &str) -> bool {
    !token.is_empty()
        && token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == ' ')
}

/// Decode `yymmddHHMM` (10 digits) as a local timestamp in the 2000s century.
fn decode_compact_timestamp(s: &str) -> Option<i64> {
    if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let yy: i32 = s[0..2].parse().ok()?;
    let mm: u32 = s[2..4].parse().ok()?;
    let dd: u32 = s[4..6].parse().ok()?;
    let hh: u32 = s[6..8].parse().ok()?;
    let min: u32 = s[8..10].parse().ok()?;

    Local
        .with_ymd_and_hms(2000 + yy, mm, dd, hh, min, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
}
