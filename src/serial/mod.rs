//! # Serial Communication Module
//!
//! Handles serial communication with the u-blox receiver.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Moving received bytes into the engine's [`BufferedTransport`]
//! - Executing the engine's queued writes and baud changes in order

pub mod port_trait;
pub mod transport;

pub use port_trait::{SerialPortIO, TokioSerialPort};
pub use transport::{BufferedTransport, GpsPort, PortOp};

use crate::error::{Result, UbxNavError};
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Fallback device paths tried after the configured one
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC receivers
];

/// Bytes read from the port per receive call
const READ_CHUNK_SIZE: usize = 256;

/// Receiver serial port handler
pub struct GpsSerial<P: SerialPortIO = TokioSerialPort> {
    port: P,
    device_path: String,
    read_buf: [u8; READ_CHUNK_SIZE],
}

impl<P: SerialPortIO> std::fmt::Debug for GpsSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl GpsSerial<TokioSerialPort> {
    /// Open the first usable device from a list of paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try in order (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Initial line speed
    ///
    /// # Returns
    ///
    /// * `Result<GpsSerial>` - Connected serial port or error
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if none of the paths could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ubx_nav::serial::GpsSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = GpsSerial::open_with_paths(&["/dev/ttyUSB0"], 115200)?;
    ///     println!("Connected to {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened GPS serial port {} at {} baud", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort::new(port), *path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(UbxNavError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| UbxNavError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<P: SerialPortIO> GpsSerial<P> {
    /// Wrap an already opened port
    pub fn with_port(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            read_buf: [0u8; READ_CHUNK_SIZE],
        }
    }

    /// Read whatever arrives within `timeout` into the transport
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of bytes received (0 on timeout)
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the port read fails
    pub async fn receive(&mut self, transport: &mut BufferedTransport, timeout: Duration) -> Result<usize> {
        let read = tokio::time::timeout(timeout, self.port.read(&mut self.read_buf)).await;

        match read {
            Err(_elapsed) => Ok(0),
            Ok(Ok(n)) => {
                transport.push_received(&self.read_buf[..n]);
                Ok(n)
            }
            Ok(Err(e)) => Err(UbxNavError::Serial(format!("Failed to read: {}", e))),
        }
    }

    /// Execute the engine's queued operations in issue order
    ///
    /// Each write is flushed before the next operation so that a following
    /// baud change never truncates it.
    ///
    /// # Errors
    ///
    /// Returns `Serial` on the first failed write, flush or baud change;
    /// operations after it are dropped.
    pub async fn flush_ops(&mut self, transport: &mut BufferedTransport) -> Result<()> {
        for op in transport.take_ops() {
            match op {
                PortOp::Write(data) => {
                    self.port.write_all(&data).await
                        .map_err(|e| UbxNavError::Serial(format!("Failed to write: {}", e)))?;
                    self.port.flush().await
                        .map_err(|e| UbxNavError::Serial(format!("Failed to flush serial port: {}", e)))?;
                    debug!("Sent {} bytes", data.len());
                }
                PortOp::SetBaud(baud_rate) => {
                    self.port.set_baud_rate(baud_rate).await
                        .map_err(|e| UbxNavError::Serial(format!("Failed to set baud rate {}: {}", baud_rate, e)))?;
                    debug!("Serial port switched to {} baud", baud_rate);
                }
            }
        }
        Ok(())
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = GpsSerial::open_with_paths(invalid_paths, 9600);

        match result.unwrap_err() {
            UbxNavError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        match GpsSerial::open_with_paths(empty_paths, 9600).unwrap_err() {
            UbxNavError::SerialPortNotFound(_) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = GpsSerial::open_port("/dev/nonexistent_serial_device_12345", 9600);

        match result.unwrap_err() {
            UbxNavError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_receive_moves_bytes_into_transport() {
        let mock = MockSerialPort::new();
        mock.queue_incoming(&[0xB5, 0x62, 0x05]);
        let mut serial = GpsSerial::with_port(mock, "mock");
        let mut transport = BufferedTransport::new(9600);

        let n = serial.receive(&mut transport, Duration::from_millis(10)).await.unwrap();

        assert_eq!(n, 3);
        assert_eq!(transport.bytes_available(), 3);
        assert_eq!(transport.read_byte(), Some(0xB5));
    }

    #[tokio::test]
    async fn test_receive_read_error() {
        let mock = MockSerialPort::new();
        mock.set_read_error(std::io::ErrorKind::BrokenPipe);
        let mut serial = GpsSerial::with_port(mock, "mock");
        let mut transport = BufferedTransport::new(9600);

        let result = serial.receive(&mut transport, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(UbxNavError::Serial(_))));
    }

    #[tokio::test]
    async fn test_flush_ops_in_order() {
        let mock = MockSerialPort::new();
        let mut serial = GpsSerial::with_port(mock.clone(), "mock");
        let mut transport = BufferedTransport::new(9600);

        transport.set_baud_rate(230400);
        transport.write_bytes(b"$PUBX");
        transport.set_baud_rate(115200);
        transport.write_bytes(&[0xB5, 0x62]);

        serial.flush_ops(&mut transport).await.unwrap();

        assert_eq!(mock.get_baud_changes(), vec![230400, 115200]);
        assert_eq!(mock.get_written_data(), vec![b"$PUBX".to_vec(), vec![0xB5, 0x62]]);
        assert!(transport.is_transmit_buffer_empty());
    }

    #[tokio::test]
    async fn test_flush_ops_write_error() {
        let mock = MockSerialPort::new();
        mock.set_write_error(std::io::ErrorKind::BrokenPipe);
        let mut serial = GpsSerial::with_port(mock, "mock");
        let mut transport = BufferedTransport::new(9600);
        transport.write_bytes(&[1, 2, 3]);

        let result = serial.flush_ops(&mut transport).await;
        match result {
            Err(UbxNavError::Serial(msg)) => assert!(msg.contains("Failed to write")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flush_ops_flush_error() {
        let mock = MockSerialPort::new();
        mock.set_flush_error(std::io::ErrorKind::TimedOut);
        let mut serial = GpsSerial::with_port(mock, "mock");
        let mut transport = BufferedTransport::new(9600);
        transport.write_bytes(&[1]);

        assert!(serial.flush_ops(&mut transport).await.is_err());
    }

    #[test]
    fn test_flush_ops_nothing_queued() {
        let mock = MockSerialPort::new();
        let mut serial = GpsSerial::with_port(mock.clone(), "mock");
        let mut transport = BufferedTransport::new(9600);

        tokio_test::assert_ok!(tokio_test::block_on(serial.flush_ops(&mut transport)));
        assert!(mock.get_written_data().is_empty());
        assert!(mock.get_baud_changes().is_empty());
    }

    #[test]
    fn test_device_path() {
        let serial = GpsSerial::with_port(MockSerialPort::new(), "/dev/ttyUSB3");
        assert_eq!(serial.device_path(), "/dev/ttyUSB3");
        assert!(format!("{:?}", serial).contains("/dev/ttyUSB3"));
    }

    // Only runs with a receiver attached
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_receive_with_real_hardware() {
        if let Ok(mut serial) = GpsSerial::open_with_paths(DEFAULT_DEVICE_PATHS, 9600) {
            let mut transport = BufferedTransport::new(9600);
            let n = serial.receive(&mut transport, Duration::from_millis(1500)).await.unwrap();
            println!("Received {} bytes from {}", n, serial.device_path());
        } else {
            println!("No GPS hardware detected (this is OK for CI/CD)");
        }
    }
}
