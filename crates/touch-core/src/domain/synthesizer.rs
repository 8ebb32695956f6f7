//! Event synthesizer: the record-by-record state machine.
//!
//! # How a slot moves through its phases (for beginners)
//!
//! Multi-touch devices speak the kernel's "type B" slot protocol.  Each finger
//! occupies a *slot*; the device first selects a slot (`ABS_MT_SLOT`) and then
//! reports fields for it.  A new contact is announced by giving the slot a
//! tracking id; a lift is announced with tracking id `-1`.
//!
//! On every synchronization record the selected slot is flushed:
//!
//! ```text
//!            SYN / slot_press          SYN / slot_move
//!   Idle ───────────────────▶ Pressed ───────────────▶ Moving ─┐
//!    ▲                           │                      ▲      │ SYN / slot_move
//!    │                           │ id -1                └──────┘
//!    │  SYN / slot_release       ▼                         │ id -1
//!    └──────────────────── ReleasePending ◀────────────────┘
//! ```
//!
//! Before the slot flush, the pointer position is compared with the position
//! last reported; a move event is emitted only when it changed.  That makes
//! repeated synchronization records without axis changes silent for the
//! pointer.
//!
//! # Failure atomicity
//!
//! [`EventSynthesizer::process`] validates a record completely before touching
//! any state.  A rejected record leaves the state and the output queue exactly
//! as they were.

use std::time::Duration;

use thiserror::Error;
use tracing::trace;

use crate::domain::event::{EventKind, TouchEvent};
use crate::domain::state::{SlotPhase, TouchState};
use crate::protocol::codes::{RecordKind, NO_CONTACT};
use crate::protocol::record::RawRecord;

/// Per-record errors.  None of them is fatal to a session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// The class/code/value combination is not one the synthesizer handles.
    #[error("unrecognized record: class 0x{class:04X}, code 0x{code:04X}, value {value}")]
    UnrecognizedRecord { class: u16, code: u16, value: u32 },

    /// A slot index at or beyond the declared slot count was selected.
    #[error("invalid slot {index}: device declares {slot_count} slot(s)")]
    InvalidSlot { index: usize, slot_count: usize },

    /// A slot-addressed record arrived on a session without slots.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Applies decoded records to a [`TouchState`] and derives [`TouchEvent`]s.
#[derive(Debug, Clone)]
pub struct EventSynthesizer {
    state: TouchState,
}

impl EventSynthesizer {
    /// Creates a synthesizer for a device with `slot_count` slots.
    ///
    /// Pass 0 to process a multi-touch device in pointer-only mode.
    pub fn new(slot_count: usize) -> Self {
        Self {
            state: TouchState::new(slot_count),
        }
    }

    /// Read-only view of the accumulated state.
    pub fn state(&self) -> &TouchState {
        &self.state
    }

    /// Applies one record, pushing any events it produces onto `out` in
    /// emission order.
    ///
    /// # Errors
    ///
    /// - [`SynthesisError::UnrecognizedRecord`] for unknown records.
    /// - [`SynthesisError::InvalidSlot`] when selecting a slot out of range.
    /// - [`SynthesisError::UnsupportedOperation`] for slot records on a
    ///   slot-less state.
    ///
    /// On error neither the state nor `out` is modified.
    pub fn process(
        &mut self,
        record: &RawRecord,
        out: &mut Vec<TouchEvent>,
    ) -> Result<(), SynthesisError> {
        let kind = RecordKind::classify(record).ok_or(SynthesisError::UnrecognizedRecord {
            class: record.class,
            code: record.code,
            value: record.value,
        })?;

        if kind.is_slot_record() && !self.state.has_slots() {
            return Err(SynthesisError::UnsupportedOperation(format!(
                "slot record {kind:?} on a device without slots"
            )));
        }

        let ts = record.timestamp;
        match kind {
            RecordKind::Sync => self.flush(ts, out),
            RecordKind::TouchButton(pressed) => {
                let event_kind = if pressed {
                    EventKind::ButtonPress
                } else {
                    EventKind::ButtonRelease
                };
                out.push(TouchEvent::pointer(
                    ts,
                    event_kind,
                    self.state.position(),
                    self.state.last_position(),
                ));
            }
            RecordKind::PositionX(x) => self.state.set_position_x(x),
            RecordKind::PositionY(y) => self.state.set_position_y(y),
            RecordKind::SlotSelect(index) => self.state.set_selected_slot(index as usize)?,
            RecordKind::SlotPositionX(x) => {
                if let Some(slot) = self.state.current_slot_mut() {
                    slot.point.x = x;
                }
            }
            RecordKind::SlotPositionY(y) => {
                if let Some(slot) = self.state.current_slot_mut() {
                    slot.point.y = y;
                }
            }
            RecordKind::TrackingId(id) => {
                if let Some(slot) = self.state.current_slot_mut() {
                    if id == NO_CONTACT {
                        slot.phase = SlotPhase::ReleasePending;
                    } else {
                        slot.identifier = id;
                    }
                }
            }
        }
        Ok(())
    }

    /// Derives events from the accumulated state at a synchronization boundary.
    fn flush(&mut self, ts: Duration, out: &mut Vec<TouchEvent>) {
        let position = self.state.position();
        if position != self.state.last_position() {
            let last = self.state.commit_position();
            trace!(x = position.x, y = position.y, "pointer moved");
            out.push(TouchEvent::pointer(ts, EventKind::Move, position, last));
        }

        let Some(slot) = self.state.current_slot_mut() else {
            return;
        };

        let kind = match slot.phase {
            SlotPhase::ReleasePending => EventKind::SlotRelease,
            SlotPhase::Pressed | SlotPhase::Moving => {
                slot.phase = SlotPhase::Moving;
                EventKind::SlotMove
            }
            SlotPhase::Idle => {
                slot.phase = SlotPhase::Pressed;
                EventKind::SlotPress
            }
        };
        trace!(slot = slot.index(), id = slot.identifier, ?kind, "slot flushed");
        out.push(TouchEvent::slot(ts, kind, slot));

        if kind == EventKind::SlotRelease {
            slot.phase = SlotPhase::Idle;
            slot.identifier = NO_CONTACT;
        }
        slot.last_point = slot.point;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
