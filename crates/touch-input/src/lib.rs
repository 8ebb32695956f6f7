//! touch-input library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does touch-input do? (for beginners)
//!
//! Linux exposes every input device as a character device under
//! `/dev/input/event*`.  Reading one yields a stream of fixed-size records,
//! each one axis change, button change or "end of report" marker.
//! touch-input turns that stream into pointer and multi-touch events:
//!
//! 1. Locates the device by node (`event3`) or by name and opens it
//!    non-blocking.
//! 2. Asks the kernel how many multi-touch slots it tracks.
//! 3. Sleeps in `epoll_wait` until the device has data.
//! 4. Decodes the available records with [`touch_core::RecordDecoder`] and
//!    feeds them to [`touch_core::EventSynthesizer`].
//! 5. Hands each resulting [`touch_core::TouchEvent`] to a caller-supplied
//!    handler, in order, on the same thread.

/// Application layer: the device session and its dispatch loop.
pub mod application;

/// Infrastructure layer: drivers, readiness polling, and configuration.
pub mod infrastructure;
