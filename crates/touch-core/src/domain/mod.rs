//! Domain entities for touch event synthesis.
//!
//! This module contains pure state-machine logic with no infrastructure
//! dependencies.
//!
//! # Why synthesize at synchronization boundaries? (for beginners)
//!
//! A single finger movement on a touchscreen arrives as several records:
//! "slot 1", "X = 310", "Y = 88", "SYN".  If an event were emitted as soon as
//! X changed, the receiver would briefly see the finger at (310, old Y), a
//! position it never occupied.  The kernel marks the end of each consistent
//! observation with a synchronization record, so every field update is only
//! *accumulated* in [`state::TouchState`] and events are derived from the
//! accumulated state when the synchronization record arrives.

/// Emitted event value types.
pub mod event;

/// Pointer position and multi-touch slot table.
pub mod state;

/// Record-by-record state machine producing events.
pub mod synthesizer;
