//! Binary codec for kernel input records.
//!
//! Wire format (compact, 32-bit kernels and the documented default):
//! ```text
//! [seconds:4][microseconds:4][class:2][code:2][value:4]
//! ```
//! Wire format (wide, 64-bit kernels where `struct timeval` holds two longs):
//! ```text
//! [seconds:8][microseconds:8][class:2][code:2][value:4]
//! ```
//! All multi-byte integers are little-endian.
//!
//! # Draining a non-blocking descriptor (for beginners)
//!
//! The device layer opens the device node with `O_NONBLOCK`, so a `read` that
//! finds nothing to deliver fails with `WouldBlock` instead of sleeping.  The
//! [`RecordDecoder`] turns that into `Ok(None)` ("nothing more right now"),
//! which tells the dispatch loop to go back to waiting for readiness.
//!
//! The kernel always hands out whole records, but other sources (sockets in
//! tests, replay files) may not.  Bytes of an incomplete record that arrive
//! before a `WouldBlock` are kept and completed on the next call; bytes of an
//! incomplete record followed by end-of-file are a [`RecordError::Malformed`].

use std::io::{self, Read};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size in bytes of a compact record.
pub const COMPACT_RECORD_SIZE: usize = 16;
/// Size in bytes of a wide record.
pub const WIDE_RECORD_SIZE: usize = 24;

/// Errors that can occur while decoding records.
///
/// Every variant is fatal for the session reading the stream.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The stream ended part-way through a record.
    #[error("malformed record: stream ended after {available} of {needed} bytes")]
    Malformed { needed: usize, available: usize },

    /// The time fields do not form a representable timestamp.
    #[error("malformed record: timestamp {seconds}s + {microseconds}us overflows")]
    InvalidTimestamp { seconds: u64, microseconds: u64 },

    /// The underlying source reported a read failure.
    #[error("read failure: {0}")]
    Read(#[from] io::Error),
}

/// Field widths of the time part of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayout {
    /// 32-bit seconds and microseconds, 16 bytes per record.
    Compact,
    /// 64-bit seconds and microseconds, 24 bytes per record.
    Wide,
}

impl RecordLayout {
    /// Returns the layout the running kernel uses for `struct input_event`.
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            RecordLayout::Wide
        } else {
            RecordLayout::Compact
        }
    }

    /// Returns the number of bytes one record occupies.
    pub const fn size(self) -> usize {
        match self {
            RecordLayout::Compact => COMPACT_RECORD_SIZE,
            RecordLayout::Wide => WIDE_RECORD_SIZE,
        }
    }

    /// Width of each of the two time fields.
    const fn time_field_size(self) -> usize {
        match self {
            RecordLayout::Compact => 4,
            RecordLayout::Wide => 8,
        }
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        RecordLayout::native()
    }
}

impl FromStr for RecordLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(RecordLayout::Compact),
            "wide" => Ok(RecordLayout::Wide),
            "native" => Ok(RecordLayout::native()),
            other => Err(format!(
                "unknown record layout '{other}' (expected compact, wide or native)"
            )),
        }
    }
}

/// One decoded input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// Time the kernel stamped on the record.
    pub timestamp: Duration,
    /// Event class (`EV_SYN`, `EV_KEY`, `EV_ABS`, ...).
    pub class: u16,
    /// Axis or button code within the class.
    pub code: u16,
    /// Raw 32-bit value.
    pub value: u32,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one record from the beginning of `bytes`.
///
/// # Errors
///
/// Returns [`RecordError::Malformed`] if `bytes` is shorter than one record,
/// or [`RecordError::InvalidTimestamp`] if the time fields overflow.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use touch_core::{decode_record, encode_record, RawRecord, RecordLayout};
///
/// let record = RawRecord { timestamp: Duration::from_micros(1_500_000), class: 3, code: 0, value: 10 };
/// let bytes = encode_record(&record, RecordLayout::Compact);
/// assert_eq!(bytes.len(), 16);
/// assert_eq!(decode_record(&bytes, RecordLayout::Compact).unwrap(), record);
/// ```
pub fn decode_record(bytes: &[u8], layout: RecordLayout) -> Result<RawRecord, RecordError> {
    let size = layout.size();
    if bytes.len() < size {
        return Err(RecordError::Malformed {
            needed: size,
            available: bytes.len(),
        });
    }

    let (seconds, microseconds) = match layout {
        RecordLayout::Compact => (
            u64::from(read_u32(bytes, 0)),
            u64::from(read_u32(bytes, 4)),
        ),
        RecordLayout::Wide => (read_u64(bytes, 0), read_u64(bytes, 8)),
    };

    let timestamp = Duration::from_secs(seconds)
        .checked_add(Duration::from_micros(microseconds))
        .ok_or(RecordError::InvalidTimestamp {
            seconds,
            microseconds,
        })?;

    let base = 2 * layout.time_field_size();
    Ok(RawRecord {
        timestamp,
        class: read_u16(bytes, base),
        code: read_u16(bytes, base + 2),
        value: read_u32(bytes, base + 4),
    })
}

/// Encodes a record in the given layout.
///
/// Compact records truncate the seconds field to 32 bits, as a 32-bit kernel does.
pub fn encode_record(record: &RawRecord, layout: RecordLayout) -> Vec<u8> {
    let mut buf = Vec::with_capacity(layout.size());
    let seconds = record.timestamp.as_secs();
    let microseconds = u64::from(record.timestamp.subsec_micros());

    match layout {
        RecordLayout::Compact => {
            buf.extend_from_slice(&(seconds as u32).to_le_bytes());
            buf.extend_from_slice(&(microseconds as u32).to_le_bytes());
        }
        RecordLayout::Wide => {
            buf.extend_from_slice(&seconds.to_le_bytes());
            buf.extend_from_slice(&microseconds.to_le_bytes());
        }
    }
    buf.extend_from_slice(&record.class.to_le_bytes());
    buf.extend_from_slice(&record.code.to_le_bytes());
    buf.extend_from_slice(&record.value.to_le_bytes());
    buf
}

/// Incremental record reader for a (possibly non-blocking) byte source.
///
/// Holds at most one partial record between calls.  The source is borrowed per
/// call so the decoder can live next to the handle that owns it.
#[derive(Debug)]
pub struct RecordDecoder {
    layout: RecordLayout,
    pending: [u8; WIDE_RECORD_SIZE],
    filled: usize,
}

impl RecordDecoder {
    /// Creates a decoder for the given layout.
    pub fn new(layout: RecordLayout) -> Self {
        Self {
            layout,
            pending: [0; WIDE_RECORD_SIZE],
            filled: 0,
        }
    }

    /// Returns the layout this decoder reads.
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Returns the number of bytes of an incomplete record held over from the
    /// last call.
    pub fn pending_bytes(&self) -> usize {
        self.filled
    }

    /// Reads the next complete record from `source`.
    ///
    /// Returns `Ok(None)` when no complete record is currently available: the
    /// source would block, or it reached end-of-file on a record boundary.
    ///
    /// # Errors
    ///
    /// - [`RecordError::Malformed`] if end-of-file arrives inside a record.
    /// - [`RecordError::InvalidTimestamp`] if the time fields overflow.
    /// - [`RecordError::Read`] for any read failure other than `WouldBlock`
    ///   or `Interrupted`.
    pub fn next_record<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
    ) -> Result<Option<RawRecord>, RecordError> {
        let size = self.layout.size();

        while self.filled < size {
            match source.read(&mut self.pending[self.filled..size]) {
                Ok(0) if self.filled == 0 => return Ok(None),
                Ok(0) => {
                    let available = self.filled;
                    self.filled = 0;
                    return Err(RecordError::Malformed {
                        needed: size,
                        available,
                    });
                }
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(RecordError::Read(e)),
            }
        }

        self.filled = 0;
        decode_record(&self.pending[..size], self.layout).map(Some)
    }
}

// ── Field readers ─────────────────────────────────────────────────────────────
//
// Callers check the total length up front, so the slices below are in bounds.

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
