//! Device driver capability.
//!
//! A [`Driver`] is an opened input device: a readable, pollable byte stream of
//! kernel input records plus a little metadata (name, class, slot count).  The
//! session layer only ever talks to this trait, so the same dispatch loop runs
//! over a real `/dev/input/event*` node or an in-memory socket in tests.
//!
//! # Implementations
//!
//! - **`evdev`** – Linux evdev nodes located by node or device name.
//! - **`mock`** – A `UnixStream` pair; tests write records into one end and the
//!   session reads them from the other.

use std::io;
use std::os::fd::RawFd;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod evdev;
pub mod mock;

/// Broad kind of input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Single absolute pointer (mouse-class).  No slots.
    Pointer,
    /// Multi-touch device reporting per-contact slots.
    Multitouch,
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Pointer => write!(f, "pointer"),
            DeviceClass::Multitouch => write!(f, "multitouch"),
        }
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pointer" | "mouse" => Ok(DeviceClass::Pointer),
            "multitouch" | "touchscreen" => Ok(DeviceClass::Multitouch),
            other => Err(format!(
                "unknown device class '{other}' (expected pointer or multitouch)"
            )),
        }
    }
}

/// Error type for driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No input device matched the requested name.
    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    /// A file-system or device I/O error occurred.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The driver has already been closed.
    #[error("driver already closed")]
    Closed,
}

/// An opened input device.
///
/// Implementations own their descriptor exclusively; a session takes the
/// driver by value and is the only reader.
#[cfg_attr(test, mockall::automock)]
pub trait Driver: Send {
    /// Logical device name.
    fn name(&self) -> &str;

    /// Pointer or multi-touch.
    fn device_class(&self) -> DeviceClass;

    /// Number of multi-touch slots; 0 for pointer devices.
    fn slot_count(&self) -> usize;

    /// Descriptor to register for readiness notifications.
    fn raw_fd(&self) -> RawFd;

    /// Reads raw record bytes.  Must not block: returns `WouldBlock` when no
    /// data is available.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Closes the device and frees the descriptor.
    fn close(&mut self) -> Result<(), DriverError>;
}
