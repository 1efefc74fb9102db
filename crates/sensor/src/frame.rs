use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use common::diagnostics::DecodeStats;

/// Shape a payload must have for a checksum failure to count as value
/// corruption; anything else is structural garbage. Informational
/// only, never gates acceptance.
static STRUCTURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\{"raw":.*?,"dst":.*?,"ocf":.*?,"cof":.*?,"lin":.*?\}$"#)
        .expect("structure pattern is valid")
});

/// One validated sensor record. Field order on the wire is fixed, but
/// the parse itself is order-independent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DecodedReading {
    pub raw: i64,
    pub dst: f64,
    pub ocf: bool,
    pub cof: bool,
    pub lin: bool,
}

/// Result of validating a single line off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ChecksumOutcome {
    Valid(DecodedReading),
    /// Checksum did not match; carries the payload (when non-empty)
    /// so the failure can be classified for diagnostics.
    ChecksumMismatch(Option<String>),
    MalformedFrame,
}

/// CRC-16 over the payload characters, polynomial 0x8005, initial
/// register 0xFFFF, MSB-first. Must stay bit-for-bit compatible with
/// the transmitter firmware.
pub fn checksum(payload: &str) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for ch in payload.chars() {
        crc ^= (((ch as u32) << 8) & 0xFFFF) as u16;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x8005;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Validates one complete line: `<payload>*<checksum_hex>`.
pub fn validate(line: &str) -> ChecksumOutcome {
    let Some((payload, transmitted_hex)) = line.rsplit_once('*') else {
        return ChecksumOutcome::MalformedFrame;
    };
    let Ok(transmitted) = u64::from_str_radix(transmitted_hex, 16) else {
        return ChecksumOutcome::MalformedFrame;
    };
    if transmitted != u64::from(checksum(payload)) {
        if payload.is_empty() {
            return ChecksumOutcome::ChecksumMismatch(None);
        }
        return ChecksumOutcome::ChecksumMismatch(Some(payload.to_string()));
    }
    match serde_json::from_str::<DecodedReading>(payload) {
        Ok(reading) => ChecksumOutcome::Valid(reading),
        Err(_) => ChecksumOutcome::MalformedFrame,
    }
}

/// Whether a payload at least looks like a sensor record.
pub fn plausible_shape(payload: &str) -> bool {
    STRUCTURE_RE.is_match(payload)
}

/// Splits an arbitrarily fragmented byte stream into validated
/// readings. Bytes after the last newline stay buffered verbatim
/// until the rest of the line arrives.
pub struct FrameCodec {
    buffer: String,
    stats: Arc<DecodeStats>,
}

impl FrameCodec {
    pub fn new(stats: Arc<DecodeStats>) -> Self {
        Self {
            buffer: String::new(),
            stats,
        }
    }

    /// The buffered partial line, if any.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Appends a chunk and drains every complete line out of the
    /// buffer. Per-line errors are absorbed here; a bad line never
    /// affects the lines after it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChecksumOutcome> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut outcomes = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let outcome = validate(line);
            self.stats.record_frame();
            match &outcome {
                ChecksumOutcome::Valid(_) => self.stats.record_accepted(),
                ChecksumOutcome::ChecksumMismatch(payload) => {
                    log::warn!("checksum failed: {line}");
                    match payload {
                        Some(p) if plausible_shape(p) => self.stats.record_value_error(),
                        _ => self.stats.record_structure_error(),
                    }
                }
                ChecksumOutcome::MalformedFrame => {
                    log::warn!("malformed frame: {line}");
                    self.stats.record_malformed();
                }
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
