//! Emitted event value types.
//!
//! Events are plain `Copy` values: the synthesizer pushes them into a queue,
//! the dispatch loop hands each one to the caller's handler by value, and
//! nothing keeps a reference afterwards.

use std::time::Duration;

use serde::Serialize;

use crate::domain::state::{Point, SlotRecord};

/// The kind of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The pointer position changed.
    Move,
    /// The touch button went down.
    ButtonPress,
    /// The touch button came up.
    ButtonRelease,
    /// A contact appeared in a slot.
    SlotPress,
    /// A contact in a slot was reported again.
    SlotMove,
    /// The contact in a slot lifted.
    SlotRelease,
}

impl EventKind {
    /// Returns `true` for the three per-slot kinds.
    pub fn is_slot_event(self) -> bool {
        matches!(
            self,
            EventKind::SlotPress | EventKind::SlotMove | EventKind::SlotRelease
        )
    }
}

/// One event delivered to the session handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TouchEvent {
    /// Timestamp of the synchronization (or button) record that produced it.
    pub timestamp: Duration,
    pub kind: EventKind,
    /// Slot index, for slot events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    /// Contact identifier, for slot events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<i32>,
    /// Current position (pointer position, or the slot's contact point).
    pub point: Point,
    /// Previously reported position.
    pub last_point: Point,
}

impl TouchEvent {
    pub(crate) fn pointer(timestamp: Duration, kind: EventKind, point: Point, last_point: Point) -> Self {
        Self {
            timestamp,
            kind,
            slot: None,
            identifier: None,
            point,
            last_point,
        }
    }

    pub(crate) fn slot(timestamp: Duration, kind: EventKind, record: &SlotRecord) -> Self {
        Self {
            timestamp,
            kind,
            slot: Some(record.index()),
            identifier: Some(record.identifier()),
            point: record.point(),
            last_point: record.last_point(),
        }
    }
}
