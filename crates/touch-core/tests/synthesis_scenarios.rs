//! Integration tests for the touch-core decoding pipeline.
//!
//! Each test builds a byte stream exactly as a device would deliver it, runs it
//! through the public [`RecordDecoder`] and [`EventSynthesizer`], and checks
//! the emitted events.

use std::io::Cursor;
use std::time::Duration;

use touch_core::protocol::codes::{
    ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_SLOT, ABS_MT_TRACKING_ID, ABS_X, ABS_Y, EV_ABS,
    EV_SYN, NO_CONTACT,
};
use touch_core::{
    encode_record, EventKind, EventSynthesizer, Point, RawRecord, RecordDecoder, RecordLayout,
    SlotPhase, SynthesisError, TouchEvent,
};

fn rec(class: u16, code: u16, value: i32) -> RawRecord {
    RawRecord {
        timestamp: Duration::new(100, 250_000),
        class,
        code,
        value: value as u32,
    }
}

fn syn() -> RawRecord {
    rec(EV_SYN, 0, 0)
}

fn stream(records: &[RawRecord], layout: RecordLayout) -> Cursor<Vec<u8>> {
    Cursor::new(
        records
            .iter()
            .flat_map(|r| encode_record(r, layout))
            .collect(),
    )
}

/// Drains `source` through the pipeline, collecting events and per-record errors.
fn run(
    synth: &mut EventSynthesizer,
    records: &[RawRecord],
    layout: RecordLayout,
) -> (Vec<TouchEvent>, Vec<SynthesisError>) {
    let mut source = stream(records, layout);
    let mut decoder = RecordDecoder::new(layout);
    let mut events = Vec::new();
    let mut errors = Vec::new();
    while let Some(record) = decoder.next_record(&mut source).expect("stream is well formed") {
        if let Err(e) = synth.process(&record, &mut events) {
            errors.push(e);
        }
    }
    (events, errors)
}

#[test]
fn test_scenario_a_single_pointer_move() {
    // Arrange
    let mut synth = EventSynthesizer::new(0);

    // Act
    let (events, errors) = run(
        &mut synth,
        &[rec(EV_ABS, ABS_X, 10), rec(EV_ABS, ABS_Y, 20), syn()],
        RecordLayout::Compact,
    );

    // Assert
    assert!(errors.is_empty());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Move);
    assert_eq!(events[0].point, Point::new(10, 20));
    assert_eq!(events[0].last_point, Point::new(0, 0));
    assert_eq!(events[0].timestamp, Duration::new(100, 250_000));
}

#[test]
fn test_scenario_b_slot_press_on_second_slot() {
    // Arrange
    let mut synth = EventSynthesizer::new(2);

    // Act
    let (events, errors) = run(
        &mut synth,
        &[
            rec(EV_ABS, ABS_MT_SLOT, 1),
            rec(EV_ABS, ABS_MT_TRACKING_ID, 5),
            rec(EV_ABS, ABS_MT_POSITION_X, 3),
            rec(EV_ABS, ABS_MT_POSITION_Y, 4),
            syn(),
        ],
        RecordLayout::Compact,
    );

    // Assert
    assert!(errors.is_empty());
    assert_eq!(events.len(), 1);
    let press = events[0];
    assert_eq!(press.kind, EventKind::SlotPress);
    assert_eq!(press.slot, Some(1));
    assert_eq!(press.identifier, Some(5));
    assert_eq!(press.point, Point::new(3, 4));
}

#[test]
fn test_scenario_c_slot_release_resets_slot() {
    // Arrange – scenario B first
    let mut synth = EventSynthesizer::new(2);
    run(
        &mut synth,
        &[
            rec(EV_ABS, ABS_MT_SLOT, 1),
            rec(EV_ABS, ABS_MT_TRACKING_ID, 5),
            rec(EV_ABS, ABS_MT_POSITION_X, 3),
            rec(EV_ABS, ABS_MT_POSITION_Y, 4),
            syn(),
        ],
        RecordLayout::Compact,
    );

    // Act
    let (events, errors) = run(
        &mut synth,
        &[rec(EV_ABS, ABS_MT_TRACKING_ID, -1), syn()],
        RecordLayout::Compact,
    );

    // Assert
    assert!(errors.is_empty());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::SlotRelease);
    assert_eq!(events[0].slot, Some(1));
    let slot = synth.state().slot_at(1).expect("slot 1");
    assert_eq!(slot.identifier(), NO_CONTACT);
    assert_eq!(slot.phase(), SlotPhase::Idle);
}

#[test]
fn test_scenario_d_unrecognized_record_is_skipped() {
    // Arrange
    let mut synth = EventSynthesizer::new(0);

    // Act – the unknown record sits between valid ones
    let (events, errors) = run(
        &mut synth,
        &[rec(EV_ABS, ABS_X, 1), rec(EV_ABS, 0x0099, 42), syn()],
        RecordLayout::Compact,
    );

    // Assert – one error, and the surrounding records still take effect
    assert_eq!(
        errors,
        vec![SynthesisError::UnrecognizedRecord { class: EV_ABS, code: 0x0099, value: 42 }]
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Move);
}

#[test]
fn test_invalid_slot_select_keeps_previous_slot_for_following_records() {
    // Arrange
    let mut synth = EventSynthesizer::new(2);

    // Act – slot 5 is rejected, so the tracking id lands in slot 0
    let (events, errors) = run(
        &mut synth,
        &[
            rec(EV_ABS, ABS_MT_SLOT, 5),
            rec(EV_ABS, ABS_MT_TRACKING_ID, 11),
            syn(),
        ],
        RecordLayout::Compact,
    );

    // Assert
    assert_eq!(errors, vec![SynthesisError::InvalidSlot { index: 5, slot_count: 2 }]);
    assert_eq!(events[0].slot, Some(0));
    assert_eq!(events[0].identifier, Some(11));
}

#[test]
fn test_wide_layout_produces_same_events() {
    // Arrange
    let records = [rec(EV_ABS, ABS_X, 10), rec(EV_ABS, ABS_Y, 20), syn()];
    let mut compact = EventSynthesizer::new(0);
    let mut wide = EventSynthesizer::new(0);

    // Act
    let (compact_events, _) = run(&mut compact, &records, RecordLayout::Compact);
    let (wide_events, _) = run(&mut wide, &records, RecordLayout::Wide);

    // Assert
    assert_eq!(compact_events, wide_events);
}

#[test]
fn test_two_finger_session_lifecycle() {
    // Arrange
    let mut synth = EventSynthesizer::new(2);

    // Act – finger A in slot 0, finger B in slot 1, then A lifts
    let (events, errors) = run(
        &mut synth,
        &[
            rec(EV_ABS, ABS_MT_SLOT, 0),
            rec(EV_ABS, ABS_MT_TRACKING_ID, 100),
            rec(EV_ABS, ABS_MT_POSITION_X, 10),
            syn(),
            rec(EV_ABS, ABS_MT_SLOT, 1),
            rec(EV_ABS, ABS_MT_TRACKING_ID, 101),
            rec(EV_ABS, ABS_MT_POSITION_X, 50),
            syn(),
            rec(EV_ABS, ABS_MT_SLOT, 0),
            rec(EV_ABS, ABS_MT_TRACKING_ID, -1),
            syn(),
        ],
        RecordLayout::Compact,
    );

    // Assert
    assert!(errors.is_empty());
    let summary: Vec<(EventKind, Option<usize>, Option<i32>)> =
        events.iter().map(|e| (e.kind, e.slot, e.identifier)).collect();
    assert_eq!(
        summary,
        vec![
            (EventKind::SlotPress, Some(0), Some(100)),
            (EventKind::SlotPress, Some(1), Some(101)),
            (EventKind::SlotRelease, Some(0), Some(100)),
        ]
    );
    assert!(synth.state().slot_at(1).expect("slot 1").is_active());
}
