use std::sync::Arc;

use common::diagnostics::DecodeStats;

use crate::frame::{ChecksumOutcome, FrameCodec};
use crate::transport::SensorTransport;

/// How far the sample is compressed past the contact point, in mm.
///
/// Two backends exist: a simulated spring derived from the elevator
/// position, and the magnetic spring sensor head read over serial.
/// The controller is written against this capability only; a run
/// never mixes the two.
pub trait CompressionSource: Send {
    /// `None` when no reading exists yet (e.g. sensor disconnected).
    fn compression_mm(&mut self, elevator_position_mm: f64) -> Option<f64>;

    /// Releases any held transport resource. Idempotent.
    fn release(&mut self) {}
}

/// Simulated spring: contact begins at a fixed elevator height.
pub struct SimulatedSpring {
    contact_offset_mm: f64,
}

impl SimulatedSpring {
    pub fn new(contact_offset_mm: f64) -> Self {
        Self { contact_offset_mm }
    }
}

impl CompressionSource for SimulatedSpring {
    fn compression_mm(&mut self, elevator_position_mm: f64) -> Option<f64> {
        Some((elevator_position_mm - self.contact_offset_mm).max(0.0))
    }
}

/// Hardware-backed spring sensor. Drains the transport on every poll,
/// feeds the codec, and keeps the last accepted displacement sticky
/// so a transient decode failure never blanks the value.
pub struct MagneticSpring {
    transport: Box<dyn SensorTransport>,
    codec: FrameCodec,
    latest_dst_mm: Option<f64>,
}

impl MagneticSpring {
    pub fn new(transport: Box<dyn SensorTransport>, stats: Arc<DecodeStats>) -> Self {
        Self {
            transport,
            codec: FrameCodec::new(stats),
            latest_dst_mm: None,
        }
    }

    fn poll(&mut self) {
        let chunk = match self.transport.bytes_available() {
            Ok(chunk) => chunk,
            Err(err) => {
                log::warn!("sensor read failed: {err}");
                return;
            }
        };
        if chunk.is_empty() {
            return;
        }
        for outcome in self.codec.feed(&chunk) {
            if let ChecksumOutcome::Valid(reading) = outcome {
                self.latest_dst_mm = Some(reading.dst);
            }
        }
    }
}

impl CompressionSource for MagneticSpring {
    fn compression_mm(&mut self, _elevator_position_mm: f64) -> Option<f64> {
        self.poll();
        self.latest_dst_mm
    }

    fn release(&mut self) {
        self.transport.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::checksum;
    use crate::transport::TransportError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTransport {
        chunks: VecDeque<Vec<u8>>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SensorTransport for ScriptedTransport {
        fn bytes_available(&mut self) -> Result<Vec<u8>, TransportError> {
            Ok(self.chunks.pop_front().unwrap_or_default())
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn frame(dst: f64) -> Vec<u8> {
        let payload =
            format!(r#"{{"raw":512,"dst":{dst},"ocf":false,"cof":false,"lin":true}}"#);
        format!("{payload}*{:04X}\n", checksum(&payload)).into_bytes()
    }

    fn spring(chunks: Vec<Vec<u8>>) -> MagneticSpring {
        MagneticSpring::new(
            Box::new(ScriptedTransport::new(chunks)),
            Arc::new(DecodeStats::new()),
        )
    }

    #[test]
    fn simulated_spring_clamps_at_contact_offset() {
        let mut spring = SimulatedSpring::new(0.2);
        assert_eq!(spring.compression_mm(0.1), Some(0.0));
        assert_eq!(spring.compression_mm(0.2), Some(0.0));
        let c = spring.compression_mm(0.7).unwrap();
        assert!((c - 0.5).abs() < 1e-12);
    }

    #[test]
    fn no_reading_until_a_first_valid_frame() {
        let mut spring = spring(vec![Vec::new(), frame(0.125)]);
        assert_eq!(spring.compression_mm(0.0), None);
        assert_eq!(spring.compression_mm(0.0), Some(0.125));
    }

    #[test]
    fn last_reading_is_sticky_across_bad_frames() {
        let mut spring = spring(vec![
            frame(0.125),
            b"corrupted*0000\n".to_vec(),
            Vec::new(),
            frame(0.25),
        ]);
        assert_eq!(spring.compression_mm(0.0), Some(0.125));
        assert_eq!(spring.compression_mm(0.0), Some(0.125));
        assert_eq!(spring.compression_mm(0.0), Some(0.125));
        assert_eq!(spring.compression_mm(0.0), Some(0.25));
    }

    #[test]
    fn only_the_newest_frame_in_a_burst_wins() {
        let mut burst = frame(0.1);
        burst.extend(frame(0.2));
        burst.extend(frame(0.3));
        let mut spring = spring(vec![burst]);
        assert_eq!(spring.compression_mm(0.0), Some(0.3));
    }

    #[test]
    fn release_is_forwarded_and_repeat_safe() {
        let transport = ScriptedTransport::new(vec![]);
        let releases = Arc::clone(&transport.releases);
        let mut spring =
            MagneticSpring::new(Box::new(transport), Arc::new(DecodeStats::new()));
        spring.release();
        spring.release();
        assert_eq!(releases.load(Ordering::Relaxed), 2);
    }
}
