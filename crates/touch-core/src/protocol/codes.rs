//! Kernel input event codes and record classification.
//!
//! Only the subset of codes that the synthesizer understands is listed here.
//! See <https://www.kernel.org/doc/Documentation/input/event-codes.txt> and
//! <https://www.kernel.org/doc/Documentation/input/multi-touch-protocol.txt>
//! for the full tables.

use crate::protocol::record::RawRecord;

// ── Event classes ─────────────────────────────────────────────────────────────

/// Synchronization marker: end of one hardware report.
pub const EV_SYN: u16 = 0x0000;
/// Key or button state change.
pub const EV_KEY: u16 = 0x0001;
/// Absolute axis value change.
pub const EV_ABS: u16 = 0x0003;

// ── Key codes ─────────────────────────────────────────────────────────────────

/// Touch contact button (reported by touchscreens and tablets).
pub const BTN_TOUCH: u16 = 0x014A;
/// `BTN_TOUCH` value for a release.
pub const BTN_TOUCH_RELEASE: u32 = 0x0000_0000;
/// `BTN_TOUCH` value for a press.
pub const BTN_TOUCH_PRESS: u32 = 0x0000_0001;

// ── Absolute axis codes ───────────────────────────────────────────────────────

pub const ABS_X: u16 = 0x0000;
pub const ABS_Y: u16 = 0x0001;
/// 47: multi-touch slot being modified.
pub const ABS_MT_SLOT: u16 = 0x002F;
/// 53: centre X of the contact in the selected slot.
pub const ABS_MT_POSITION_X: u16 = 0x0035;
/// 54: centre Y of the contact in the selected slot.
pub const ABS_MT_POSITION_Y: u16 = 0x0036;
/// 57: unique id of the contact in the selected slot.
pub const ABS_MT_TRACKING_ID: u16 = 0x0039;

/// Tracking id value meaning "the contact in this slot has lifted".
pub const NO_CONTACT: i32 = -1;

// ── Classification ────────────────────────────────────────────────────────────

/// A record the synthesizer knows how to apply, with its value already
/// converted to the type the field needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// End of one hardware report.
    Sync,
    /// Touch button pressed (`true`) or released (`false`).
    TouchButton(bool),
    /// Absolute pointer X.
    PositionX(i32),
    /// Absolute pointer Y.
    PositionY(i32),
    /// Select the slot that following slot records apply to.
    SlotSelect(u32),
    /// X of the contact in the selected slot.
    SlotPositionX(i32),
    /// Y of the contact in the selected slot.
    SlotPositionY(i32),
    /// Tracking id of the contact in the selected slot, sign-extended from
    /// 16 bits; [`NO_CONTACT`] marks a lift.
    TrackingId(i32),
}

impl RecordKind {
    /// Classifies a raw record, returning `None` for any class/code/value
    /// combination outside the recognized set.
    pub fn classify(record: &RawRecord) -> Option<Self> {
        // Axis values travel as u32 but are signed on the kernel side.
        let signed = record.value as i32;
        match (record.class, record.code) {
            (EV_SYN, _) => Some(RecordKind::Sync),
            (EV_KEY, BTN_TOUCH) => match record.value {
                BTN_TOUCH_PRESS => Some(RecordKind::TouchButton(true)),
                BTN_TOUCH_RELEASE => Some(RecordKind::TouchButton(false)),
                _ => None,
            },
            (EV_ABS, ABS_X) => Some(RecordKind::PositionX(signed)),
            (EV_ABS, ABS_Y) => Some(RecordKind::PositionY(signed)),
            (EV_ABS, ABS_MT_SLOT) => Some(RecordKind::SlotSelect(record.value)),
            (EV_ABS, ABS_MT_POSITION_X) => Some(RecordKind::SlotPositionX(signed)),
            (EV_ABS, ABS_MT_POSITION_Y) => Some(RecordKind::SlotPositionY(signed)),
            (EV_ABS, ABS_MT_TRACKING_ID) => {
                Some(RecordKind::TrackingId(i32::from(record.value as u16 as i16)))
            }
            _ => None,
        }
    }

    /// Returns `true` for records that address the selected multi-touch slot.
    pub fn is_slot_record(&self) -> bool {
        matches!(
            self,
            RecordKind::SlotSelect(_)
                | RecordKind::SlotPositionX(_)
                | RecordKind::SlotPositionY(_)
                | RecordKind::TrackingId(_)
        )
    }
}
