//! # touch-core
//!
//! Decoding engine for kernel input records: turns the raw byte stream of a
//! pointer or multi-touch device into typed press / release / move events.
//!
//! This crate is used by the `touch-input` device layer.
//! It has zero dependencies on OS APIs, file descriptors, or threads.
//!
//! # Architecture overview (for beginners)
//!
//! A Linux input device (mouse, touchscreen) does not hand out "events" in the
//! sense an application wants them.  It writes a stream of small fixed-size
//! *records*, each describing one field of one observation: "X is now 310",
//! "the finger in slot 1 has tracking id 7", "end of report".  Only when the
//! end-of-report (synchronization) record arrives do the preceding records
//! form a consistent picture.
//!
//! This crate is split in two:
//!
//! - **`protocol`** – How bytes become records.  Each record is decoded from a
//!   fixed 16-byte (or 24-byte, on 64-bit kernels) little-endian layout into a
//!   [`RawRecord`].
//!
//! - **`domain`** – What records mean.  The [`EventSynthesizer`] applies records
//!   to the [`TouchState`] (pointer position plus one [`SlotRecord`] per finger)
//!   and, at every synchronization boundary, emits [`TouchEvent`]s.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `touch_core::TouchEvent` instead of `touch_core::domain::event::TouchEvent`.
pub use domain::event::{EventKind, TouchEvent};
pub use domain::state::{Point, SlotPhase, SlotRecord, TouchState};
pub use domain::synthesizer::{EventSynthesizer, SynthesisError};
pub use protocol::codes::RecordKind;
pub use protocol::record::{
    decode_record, encode_record, RawRecord, RecordDecoder, RecordError, RecordLayout,
};
