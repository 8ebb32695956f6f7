//! Infrastructure layer for the touch-input tool.
//!
//! Contains OS-facing adapters: device drivers, the epoll readiness poller,
//! and configuration storage.
//!
//! # Sub-modules
//!
//! - **`driver`** – The `Driver` capability trait, the Linux evdev driver, and
//!   a socket-pair driver for tests.
//!
//! - **`poller`** – Blocks on `epoll_wait` for one descriptor.
//!
//! - **`storage`** – TOML configuration file load/save.

pub mod driver;
pub mod poller;
pub mod storage;
