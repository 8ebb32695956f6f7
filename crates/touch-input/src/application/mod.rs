//! Application layer for the touch-input tool.
//!
//! # What use cases does touch-input have?
//!
//! - **`session`** – Opens a [`Driver`](crate::infrastructure::driver::Driver)
//!   as a `DeviceSession` and runs the blocking dispatch loop that turns
//!   readiness notifications into delivered `TouchEvent`s.

pub mod session;
