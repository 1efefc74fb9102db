use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session decode counters, shared with the frame codec by `Arc`.
///
/// A checksum failure is classified further: a payload that still
/// looks like a sensor record took a hit in its values, anything else
/// is structural corruption. Resetting happens by constructing a
/// fresh collector for the next session.
#[derive(Debug, Default)]
pub struct DecodeStats {
    frames_total: AtomicU64,
    accepted: AtomicU64,
    malformed: AtomicU64,
    structure_errors: AtomicU64,
    value_errors: AtomicU64,
}

impl DecodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_structure_error(&self) {
        self.structure_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_value_error(&self) {
        self.value_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DecodeReport {
        DecodeReport {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            structure_errors: self.structure_errors.load(Ordering::Relaxed),
            value_errors: self.value_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeReport {
    pub frames_total: u64,
    pub accepted: u64,
    pub malformed: u64,
    pub structure_errors: u64,
    pub value_errors: u64,
}

impl DecodeReport {
    fn rate(&self, count: u64) -> f64 {
        if self.frames_total == 0 {
            0.0
        } else {
            count as f64 / self.frames_total as f64 * 100.0
        }
    }
}

impl fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Struct Errors: {} ({:.2}%) | Value Errors: {} ({:.2}%) | Malformed: {}",
            self.frames_total,
            self.structure_errors,
            self.rate(self.structure_errors),
            self.value_errors,
            self.rate(self.value_errors),
            self.malformed,
        )
    }
}
