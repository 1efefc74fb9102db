pub mod frame;
pub mod spring;
pub mod transport;

pub use frame::{checksum, validate, ChecksumOutcome, DecodedReading, FrameCodec};
pub use spring::{CompressionSource, MagneticSpring, SimulatedSpring};
pub use transport::{SensorTransport, SerialTransport, TransportError};
