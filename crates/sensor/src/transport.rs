use std::io::Read;
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no suitable serial port found")]
    PortUnavailable,
    #[error("serial connection failed: {0}")]
    Connection(#[from] serialport::Error),
    #[error("serial read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw byte source feeding the frame codec. The codec's buffer is
/// owned by whoever owns the transport; there is exactly one reader.
pub trait SensorTransport: Send {
    /// Drains whatever the device has sent since the last call.
    /// Never blocks waiting for a full frame.
    fn bytes_available(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Closes the underlying resource. Idempotent.
    fn release(&mut self);
}

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial-port transport for the displacement sensor (115200 8N1).
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Opens `port_name`, or auto-detects the sensor's USB bridge when
    /// no name is given.
    pub fn open(port_name: Option<&str>, baud_rate: u32) -> Result<Self, TransportError> {
        let name = match port_name {
            Some(name) => name.to_string(),
            None => auto_detect_port()?,
        };
        let port = serialport::new(&name, baud_rate)
            .timeout(Duration::from_millis(1000))
            .open()?;
        log::info!("sensor connected on {name}");
        Ok(Self { port: Some(port) })
    }
}

impl SensorTransport for SerialTransport {
    fn bytes_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let Some(port) = self.port.as_mut() else {
            return Ok(Vec::new());
        };
        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }
        let mut chunk = vec![0u8; pending];
        port.read_exact(&mut chunk)?;
        Ok(chunk)
    }

    fn release(&mut self) {
        if self.port.take().is_some() {
            log::info!("sensor port released");
        }
    }
}

/// Picks the first port whose description matches the USB bridge
/// chips the sensor heads ship with.
pub fn auto_detect_port() -> Result<String, TransportError> {
    for info in serialport::available_ports()? {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let mut parts = Vec::new();
                if let Some(manufacturer) = &usb.manufacturer {
                    parts.push(manufacturer.clone());
                }
                if let Some(product) = &usb.product {
                    parts.push(product.clone());
                }
                parts.join(" ")
            }
            other => format!("{other:?}"),
        };
        if ["USB", "CH340", "Serial"]
            .iter()
            .any(|tag| description.contains(tag))
        {
            log::info!("auto-detected sensor port {} ({description})", info.port_name);
            return Ok(info.port_name);
        }
    }
    Err(TransportError::PortUnavailable)
}
