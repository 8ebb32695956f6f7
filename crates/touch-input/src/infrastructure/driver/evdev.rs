//! Linux evdev driver.
//!
//! Locates an input device among the `/dev/input/event*` nodes, opens it
//! non-blocking, and queries its multi-touch slot count through the `evdev`
//! crate.
//!
//! # What is evdev? (for beginners)
//!
//! Every input device the Linux kernel knows about (mouse, keyboard,
//! touchscreen, tablet) gets a character device node `/dev/input/eventN`.
//! Reading it yields a stream of `struct input_event` records; the kernel never
//! splits a record across reads.  Each device also reports a human-readable
//! name, which the `evdev` crate reads with an ioctl.
//!
//! Devices can be requested by node (`event3`) or by that name
//! (`FT5406 memory based driver`).
//!
//! # Slot count
//!
//! Multi-touch devices using the slot protocol advertise the `ABS_MT_SLOT`
//! axis.  Its range `[0, maximum]` is the slot table size, so a device reports
//! `maximum + 1` slots.  The query opens the node with [`evdev::Device`]:
//!
//! - `supported_absolute_axes()` – without `ABS_MT_SLOT` the device has no
//!   slots.
//! - `get_absinfo()` – the `ABS_MT_SLOT` range.
//!
//! The record stream itself is read from a separate non-blocking [`File`] so
//! the raw bytes reach [`touch_core::RecordDecoder`] unchanged.
//!
//! # Permissions
//!
//! Device nodes are usually `root:input 0660`.  Opening one as a regular user
//! fails with `PermissionDenied` unless the user is in the `input` group.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use evdev::AbsoluteAxisCode;
use tracing::{debug, info};

use super::{DeviceClass, Driver, DriverError};

/// Directory holding the device nodes.
pub const PATH_DEV_INPUT: &str = "/dev/input";

/// How to open an evdev device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvdevConfig {
    /// Node name (`event3`) or device name.
    pub name: String,
    /// Forces the device class instead of deriving it from the slot count.
    pub class: Option<DeviceClass>,
    /// Forces the slot count instead of querying the device.
    pub slots: Option<usize>,
}

/// One input device found under `/dev/input`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Node name, e.g. `event3`.
    pub node: String,
    /// Device name reported by the kernel.
    pub name: String,
    /// Path of the device node.
    pub path: PathBuf,
}

/// An opened evdev device node.
pub struct EvdevDriver {
    path: PathBuf,
    name: String,
    class: DeviceClass,
    slots: usize,
    file: Option<File>,
}

impl EvdevDriver {
    /// Locates and opens the device named in `config`.
    ///
    /// # Errors
    ///
    /// - [`DriverError::DeviceNotFound`] if no device matches.
    /// - [`DriverError::Io`] if the node cannot be opened.
    pub fn open(config: &EvdevConfig) -> Result<Self, DriverError> {
        let entry = find_device(list_devices()?, &config.name)?;
        Self::open_entry(entry, config)
    }

    fn open_entry(entry: DeviceEntry, config: &EvdevConfig) -> Result<Self, DriverError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(&entry.path)
            .map_err(|source| DriverError::Io {
                path: entry.path.clone(),
                source,
            })?;

        let slots = match config.slots {
            Some(n) => n,
            None => query_slot_count(&entry.path),
        };
        let class = config.class.unwrap_or(if slots > 0 {
            DeviceClass::Multitouch
        } else {
            DeviceClass::Pointer
        });

        info!(
            "opened {} ({}) as {class} with {slots} slot(s)",
            entry.path.display(),
            entry.name
        );
        Ok(Self {
            path: entry.path,
            name: entry.name,
            class,
            slots,
            file: Some(file),
        })
    }

    /// Path of the opened device node.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Driver for EvdevDriver {
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
        self.file.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        let file = self.file.take().ok_or(DriverError::Closed)?;
        drop(file);
        debug!("closed {}", self.path.display());
        Ok(())
    }
}

impl std::fmt::Debug for EvdevDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevDriver")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("class", &self.class)
            .field("slots", &self.slots)
            .field("open", &self.file.is_some())
            .finish()
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Lists the evdev devices this process can open, sorted by node number.
///
/// Nodes that cannot be opened (usually for lack of permission) are skipped.
///
/// # Errors
///
/// Returns [`DriverError::Io`] if `/dev/input` cannot be read.
pub fn list_devices() -> Result<Vec<DeviceEntry>, DriverError> {
    fs::metadata(PATH_DEV_INPUT).map_err(|source| DriverError::Io {
        path: PathBuf::from(PATH_DEV_INPUT),
        source,
    })?;

    let mut entries: Vec<DeviceEntry> = evdev::enumerate()
        .filter_map(|(path, device)| {
            let node = path.file_name()?.to_str()?.to_string();
            Some(DeviceEntry {
                name: device.name().unwrap_or("unknown").trim().to_string(),
                node,
                path,
            })
        })
        .collect();

    sort_by_node(&mut entries);
    Ok(entries)
}

fn sort_by_node(entries: &mut [DeviceEntry]) {
    entries.sort_by_key(|e| node_number(&e.node));
}

/// Picks the entry whose node or name equals `wanted`.
fn find_device(entries: Vec<DeviceEntry>, wanted: &str) -> Result<DeviceEntry, DriverError> {
    entries
        .into_iter()
        .find(|e| e.node == wanted || e.name == wanted)
        .ok_or_else(|| DriverError::DeviceNotFound(wanted.to_string()))
}

fn node_number(node: &str) -> u32 {
    node.trim_start_matches("event").parse().unwrap_or(u32::MAX)
}

// ── Capability query ──────────────────────────────────────────────────────────

/// Queries the slot count of the device at `path`; 0 when it is not an evdev
/// node, does not use the slot protocol, or cannot be queried.
fn query_slot_count(path: &Path) -> usize {
    let device = match evdev::Device::open(path) {
        Ok(device) => device,
        Err(e) => {
            debug!("capability query of {} failed: {e}", path.display());
            return 0;
        }
    };

    let has_slots = device
        .supported_absolute_axes()
        .is_some_and(|axes| axes.contains(AbsoluteAxisCode::ABS_MT_SLOT));
    if !has_slots {
        return 0;
    }

    let count = match device.get_absinfo() {
        Ok(mut axes) => axes
            .find(|(code, _)| *code == AbsoluteAxisCode::ABS_MT_SLOT)
            .map_or(0, |(_, info)| slot_count_from_range(info.maximum())),
        Err(e) => {
            debug!("reading ABS_MT_SLOT range of {} failed: {e}", path.display());
            0
        }
    };
    count
}

fn slot_count_from_range(maximum: i32) -> usize {
    usize::try_from(maximum).map_or(0, |m| m + 1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
