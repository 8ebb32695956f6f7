//! Position and slot state.
//!
//! Holds the absolute pointer position, the last position reported in a move
//! event, the currently selected multi-touch slot, and one [`SlotRecord`] per
//! slot the device declares.  Only the synthesizer mutates it.

use serde::{Deserialize, Serialize};

use crate::domain::synthesizer::SynthesisError;
use crate::protocol::codes::NO_CONTACT;

/// A point in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// The origin, (0, 0).
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    /// Creates a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Transient phase of a slot between synchronization boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotPhase {
    /// No contact has been reported, or the last contact was released.
    #[default]
    Idle,
    /// The last flush emitted a slot press.
    Pressed,
    /// The last flush emitted a slot move.
    Moving,
    /// A lift was seen; the next flush emits a slot release.
    ReleasePending,
}

/// Per-contact state for one multi-touch slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    index: usize,
    pub(crate) identifier: i32,
    pub(crate) point: Point,
    pub(crate) last_point: Point,
    pub(crate) phase: SlotPhase,
}

impl SlotRecord {
    fn new(index: usize) -> Self {
        Self {
            index,
            identifier: NO_CONTACT,
            point: Point::ORIGIN,
            last_point: Point::ORIGIN,
            phase: SlotPhase::Idle,
        }
    }

    /// Slot index within the device's slot table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Contact identifier; [`NO_CONTACT`] when no contact is active.
    ///
    /// Only meaningful while [`phase`](Self::phase) is not [`SlotPhase::Idle`].
    pub fn identifier(&self) -> i32 {
        self.identifier
    }

    /// Current contact position.
    pub fn point(&self) -> Point {
        self.point
    }

    /// Position reported at the previous flush of this slot.
    pub fn last_point(&self) -> Point {
        self.last_point
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// Returns `true` while a contact is down in this slot.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, SlotPhase::Pressed | SlotPhase::Moving)
    }
}

/// Mutable position and slot state of one device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchState {
    position: Point,
    last_position: Point,
    selected: usize,
    slots: Vec<SlotRecord>,
}

impl TouchState {
    /// Creates state for a device with `slot_count` multi-touch slots.
    ///
    /// A slot count of 0 describes a single-pointer device: no slot-indexed
    /// operation is reachable.
    pub fn new(slot_count: usize) -> Self {
        Self {
            position: Point::ORIGIN,
            last_position: Point::ORIGIN,
            selected: 0,
            slots: (0..slot_count).map(SlotRecord::new).collect(),
        }
    }

    /// Current absolute pointer position.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Position carried by the most recent move event.
    pub fn last_position(&self) -> Point {
        self.last_position
    }

    /// Number of slots the state tracks.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn has_slots(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Index of the currently selected slot (0 on slot-less devices).
    pub fn selected_slot(&self) -> usize {
        self.selected
    }

    /// Selects the slot that subsequent slot records apply to.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::InvalidSlot`] if `index` is outside
    /// `[0, slot_count)`; the previous selection is kept.
    pub fn set_selected_slot(&mut self, index: usize) -> Result<(), SynthesisError> {
        if index >= self.slots.len() {
            return Err(SynthesisError::InvalidSlot {
                index,
                slot_count: self.slots.len(),
            });
        }
        self.selected = index;
        Ok(())
    }

    /// Returns the slot record at `index`, or `None` if out of range.
    pub fn slot_at(&self, index: usize) -> Option<&SlotRecord> {
        self.slots.get(index)
    }

    /// Returns the currently selected slot record, or `None` on slot-less devices.
    pub fn current_slot(&self) -> Option<&SlotRecord> {
        self.slots.get(self.selected)
    }

    /// Iterates over all slot records in index order.
    pub fn slots(&self) -> impl Iterator<Item = &SlotRecord> {
        self.slots.iter()
    }

    pub(crate) fn current_slot_mut(&mut self) -> Option<&mut SlotRecord> {
        self.slots.get_mut(self.selected)
    }

    pub(crate) fn set_position_x(&mut self, x: i32) {
        self.position.x = x;
    }

    pub(crate) fn set_position_y(&mut self, y: i32) {
        self.position.y = y;
    }

    /// Marks the current position as reported and returns the previous one.
    pub(crate) fn commit_position(&mut self) -> Point {
        std::mem::replace(&mut self.last_position, self.position)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_for_pointer_device_has_no_slots() {
        // Arrange / Act
        let state = TouchState::new(0);

        // Assert
        assert!(!state.has_slots());
        assert_eq!(state.selected_slot(), 0);
        assert!(state.current_slot().is_none());
        assert_eq!(state.position(), Point::ORIGIN);
        assert_eq!(state.last_position(), Point::ORIGIN);
    }

    #[test]
    fn test_new_state_creates_idle_slots_with_indices() {
        let state = TouchState::new(3);

        let indices: Vec<usize> = state.slots().map(SlotRecord::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        for slot in state.slots() {
            assert_eq!(slot.phase(), SlotPhase::Idle);
            assert_eq!(slot.identifier(), NO_CONTACT);
            assert!(!slot.is_active());
        }
    }

    #[test]
    fn test_set_selected_slot_within_range() {
        // Arrange
        let mut state = TouchState::new(2);

        // Act
        state.set_selected_slot(1).expect("slot 1 exists");

        // Assert
        assert_eq!(state.selected_slot(), 1);
        assert_eq!(state.current_slot().map(SlotRecord::index), Some(1));
    }

    #[test]
    fn test_set_selected_slot_out_of_range_keeps_previous_selection() {
        // Arrange
        let mut state = TouchState::new(2);
        state.set_selected_slot(1).expect("slot 1 exists");

        // Act
        let result = state.set_selected_slot(2);

        // Assert
        assert_eq!(
            result,
            Err(SynthesisError::InvalidSlot { index: 2, slot_count: 2 })
        );
        assert_eq!(state.selected_slot(), 1);
    }

    #[test]
    fn test_set_selected_slot_on_slotless_state_fails() {
        let mut state = TouchState::new(0);
        assert!(matches!(
            state.set_selected_slot(0),
            Err(SynthesisError::InvalidSlot { index: 0, slot_count: 0 })
        ));
    }

    #[test]
    fn test_slot_at_out_of_range_is_none() {
        let state = TouchState::new(2);
        assert!(state.slot_at(1).is_some());
        assert!(state.slot_at(2).is_none());
    }

    #[test]
    fn test_commit_position_returns_previous_and_updates_last() {
        // Arrange
        let mut state = TouchState::new(0);
        state.set_position_x(4);
        state.set_position_y(9);

        // Act
        let previous = state.commit_position();

        // Assert
        assert_eq!(previous, Point::ORIGIN);
        assert_eq!(state.last_position(), Point::new(4, 9));
    }
}
