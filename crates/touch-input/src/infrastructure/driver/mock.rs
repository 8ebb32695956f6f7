//! In-memory driver for tests and demos.
//!
//! # Why a socket pair?
//!
//! The dispatch loop waits on a real file descriptor with `epoll`, so a plain
//! `Vec<u8>` cannot stand in for a device.  A connected `UnixStream` pair is
//! pollable, can be made non-blocking, and behaves like a device node in the
//! ways the loop cares about:
//!
//! - Writing to the [`SocketFeeder`] makes the driver end readable.
//! - Reading an empty driver end fails with `WouldBlock`.
//! - Dropping the feeder hangs up the driver end.
//!
//! # Usage in tests
//!
//! ```ignore
//! let (driver, mut feeder) =
//!     SocketDriver::pair("touch", DeviceClass::Multitouch, 2, RecordLayout::Compact)?;
//! feeder.send(&[slot_select(1), tracking_id(5), syn()])?;
//! let session = DeviceSession::open(driver, SessionOptions::compact())?;
//! ```

use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use touch_core::{encode_record, RawRecord, RecordLayout};

use super::{DeviceClass, Driver, DriverError};

/// Driver end of a socket pair.
pub struct SocketDriver {
    name: String,
    class: DeviceClass,
    slots: usize,
    stream: Option<UnixStream>,
    closed: Arc<AtomicBool>,
}

/// Writer end of a socket pair, standing in for the kernel.
pub struct SocketFeeder {
    stream: UnixStream,
    layout: RecordLayout,
    closed: Arc<AtomicBool>,
}

impl SocketDriver {
    /// Creates a connected driver/feeder pair.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Io`] if the socket pair cannot be created or
    /// made non-blocking.
    pub fn pair(
        name: impl Into<String>,
        class: DeviceClass,
        slots: usize,
        layout: RecordLayout,
    ) -> Result<(Self, SocketFeeder), DriverError> {
        let io_err = |source| DriverError::Io {
            path: PathBuf::from("socketpair"),
            source,
        };
        let (reader, writer) = UnixStream::pair().map_err(io_err)?;
        reader.set_nonblocking(true).map_err(io_err)?;

        let closed = Arc::new(AtomicBool::new(false));
        let driver = Self {
            name: name.into(),
            class,
            slots,
            stream: Some(reader),
            closed: Arc::clone(&closed),
        };
        let feeder = SocketFeeder {
            stream: writer,
            layout,
            closed,
        };
        Ok((driver, feeder))
    }
}

impl Driver for SocketDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_class(&self) -> DeviceClass {
        self.class
    }

    fn slot_count(&self) -> usize {
        self.slots
    }

    fn raw_fd(&self) -> RawFd {
        self.stream.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        // Dropping the stream closes the descriptor.
        self.stream.take().ok_or(DriverError::Closed)?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl SocketFeeder {
    /// Encodes and writes records in the pair's layout.
    pub fn send(&mut self, records: &[RawRecord]) -> io::Result<()> {
        let bytes: Vec<u8> = records
            .iter()
            .flat_map(|r| encode_record(r, self.layout))
            .collect();
        self.send_bytes(&bytes)
    }

    /// Writes raw bytes, e.g. to simulate a truncated record.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    /// Returns `true` once the driver end has been closed by its owner.
    pub fn is_driver_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Half-closes the writer so the driver sees end-of-file after the
    /// remaining bytes, while this feeder can still observe closure.
    pub fn hang_up(&self) -> io::Result<()> {
        self.stream.shutdown(std::net::Shutdown::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record() -> RawRecord {
        RawRecord {
            timestamp: Duration::from_secs(1),
            class: 3,
            code: 0,
            value: 7,
        }
    }

    #[test]
    fn test_socket_driver_reports_metadata() {
        // Arrange / Act
        let (driver, _feeder) =
            SocketDriver::pair("panel", DeviceClass::Multitouch, 4, RecordLayout::Compact)
                .expect("pair");

        // Assert
        assert_eq!(driver.name(), "panel");
        assert_eq!(driver.device_class(), DeviceClass::Multitouch);
        assert_eq!(driver.slot_count(), 4);
        assert!(driver.raw_fd() >= 0);
    }

    #[test]
    fn test_empty_socket_driver_would_block() {
        let (mut driver, _feeder) =
            SocketDriver::pair("p", DeviceClass::Pointer, 0, RecordLayout::Compact).expect("pair");

        let mut buf = [0u8; 16];
        let err = driver.read(&mut buf).expect_err("nothing written yet");

        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_feeder_send_writes_encoded_records() {
        // Arrange
        let (mut driver, mut feeder) =
            SocketDriver::pair("p", DeviceClass::Pointer, 0, RecordLayout::Compact).expect("pair");

        // Act
        feeder.send(&[record()]).expect("send");
        let mut buf = [0u8; 16];
        let n = driver.read(&mut buf).expect("read");

        // Assert
        assert_eq!(n, 16);
        assert_eq!(buf.to_vec(), encode_record(&record(), RecordLayout::Compact));
    }

    #[test]
    fn test_close_is_observable_from_feeder_and_not_repeatable() {
        let (mut driver, feeder) =
            SocketDriver::pair("p", DeviceClass::Pointer, 0, RecordLayout::Compact).expect("pair");

        driver.close().expect("first close");

        assert!(feeder.is_driver_closed());
        assert_eq!(driver.raw_fd(), -1);
        assert!(matches!(driver.close(), Err(DriverError::Closed)));
    }

    #[test]
    fn test_hang_up_gives_end_of_file() {
        let (mut driver, feeder) =
            SocketDriver::pair("p", DeviceClass::Pointer, 0, RecordLayout::Compact).expect("pair");

        feeder.hang_up().expect("shutdown");
        let mut buf = [0u8; 16];

        assert_eq!(driver.read(&mut buf).expect("eof"), 0);
    }
}
