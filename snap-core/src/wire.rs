//! Framing: classify link messages into control frames and photo data.
//!
//! The link carries no framing of its own. A message is a control frame when it is
//! UTF-8 text matching `START:<size>[:<timestamp>]` or exactly `END`; everything else is
//! data. Classification never fails: malformed control fields degrade to defaults.

use crate::chunk;
use crate::protocol::{ControlFrame, Frame, END_MARKER, FIELD_SEPARATOR, START_PREFIX};

/// Classify one link message. Pure; does not look at transfer state.
pub fn classify(bytes: &[u8]) -> Frame<'_> {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return Frame::Chunk(bytes);
    };
    if let Some(rest) = text.strip_prefix(START_PREFIX) {
        return Frame::Control(parse_start(rest));
    }
    if text == END_MARKER {
        return Frame::Control(ControlFrame::End);
    }
    Frame::Text(text)
}

/// Parse the part of a `START` frame after the prefix: `<size>[:<timestamp>]`.
pub fn parse_start(fields: &str) -> ControlFrame {
    let mut parts = fields.split(FIELD_SEPARATOR);
    let size_field = parts.next().unwrap_or("");
    let expected_size = match parse_size(size_field) {
        SizeParse::Exact(n) => n,
        SizeParse::Recovered { value, raw } => {
            tracing::warn!(
                event = "start_size_recovered",
                raw = raw.as_str(),
                size = value
            );
            value
        }
        SizeParse::Unparsable { raw } => {
            tracing::warn!(event = "start_size_unparsable", raw = raw.as_str());
            0
        }
    };
    let timestamp = parts.next().and_then(parse_timestamp);
    ControlFrame::Start {
        expected_size,
        timestamp,
    }
}

/// Which stage of the two-stage size parse produced the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeParse {
    /// Trimmed field was a plain decimal integer.
    Exact(u64),
    /// Strict parse failed; the digits left after dropping everything else parsed.
    Recovered { value: u64, raw: String },
    /// Neither stage produced a number. Callers treat the size as 0.
    Unparsable { raw: String },
}

impl SizeParse {
    pub fn value(&self) -> u64 {
        match self {
            SizeParse::Exact(n) => *n,
            SizeParse::Recovered { value, .. } => *value,
            SizeParse::Unparsable { .. } => 0,
        }
    }
}

/// Strict decimal parse of the trimmed field, then a digits-only fallback.
pub fn parse_size(field: &str) -> SizeParse {
    let trimmed = field.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return SizeParse::Exact(n);
    }
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u64>() {
        Ok(value) => SizeParse::Recovered {
            value,
            raw: trimmed.to_string(),
        },
        Err(_) => SizeParse::Unparsable {
            raw: trimmed.to_string(),
        },
    }
}

/// Timestamp field as `u32`, parsed as-is (only the size field is trimmed).
/// Anything unparsable counts as absent.
pub fn parse_timestamp(field: &str) -> Option<u32> {
    match field.parse::<u32>() {
        Ok(ts) => Some(ts),
        Err(_) => {
            tracing::debug!(event = "start_timestamp_ignored", raw = field);
            None
        }
    }
}

/// Encode a control frame in its text wire form.
pub fn encode_control(frame: &ControlFrame) -> Vec<u8> {
    match frame {
        ControlFrame::Start {
            expected_size,
            timestamp: Some(ts),
        } => format!("{START_PREFIX}{expected_size}{FIELD_SEPARATOR}{ts}").into_bytes(),
        ControlFrame::Start {
            expected_size,
            timestamp: None,
        } => format!("{START_PREFIX}{expected_size}").into_bytes(),
        ControlFrame::End => END_MARKER.as_bytes().to_vec(),
    }
}

/// Sender side: the full message sequence for one photo (`START`, chunks, `END`).
pub fn encode_transfer(photo: &[u8], chunk_size: usize, timestamp: Option<u32>) -> Vec<Vec<u8>> {
    let start = ControlFrame::Start {
        expected_size: photo.len() as u64,
        timestamp,
    };
    let mut out = Vec::new();
    out.push(encode_control(&start));
    out.extend(
        chunk::split_payload(photo, chunk_size)
            .into_iter()
            .map(<[u8]>::to_vec),
    );
    out.push(encode_control(&ControlFrame::End));
    out
}
