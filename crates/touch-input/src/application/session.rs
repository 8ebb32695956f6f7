//! DeviceSession: owns one opened device and runs its dispatch loop.
//!
//! A session binds a [`Driver`] to an epoll [`Poller`], a [`RecordDecoder`]
//! and an [`EventSynthesizer`].  [`DeviceSession::run`] blocks the calling
//! thread, waking on readiness to drain records and deliver the resulting
//! [`TouchEvent`]s to a handler, in order, before reading any further bytes.
//!
//! # Loop states
//!
//! ```text
//! Idle ──validate mode──► Waiting ──readable──► Draining ──would block──► Waiting
//!   │                        │                      │
//!   └─ unsupported ──────────┴── shutdown / fatal ──┴──────────► Closed
//! ```
//!
//! # Error policy
//!
//! Rejected records (unknown codes, out-of-range slot selection, slot codes
//! on a slot-less session) are logged, counted in [`SessionStats::rejected`],
//! and skipped.  Truncated records, read failures, readiness failures and a
//! hung-up device end the loop with a [`SessionError`].  The driver is closed
//! on every exit path.

use std::io::{self, Read};
use std::str::FromStr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touch_core::{
    EventSynthesizer, Point, RecordDecoder, RecordError, RecordLayout, SynthesisError, TouchEvent,
    TouchState,
};
use tracing::{debug, error, info, trace, warn};

use crate::infrastructure::driver::{DeviceClass, Driver, DriverError};
use crate::infrastructure::poller::{PollError, Poller};

/// Error type for session lifecycle and dispatch failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested dispatch mode does not fit the device.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A record could not be read or decoded.
    #[error("record stream failed: {0}")]
    Record(#[from] RecordError),

    /// Readiness registration or wait failed.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// The driver failed to close.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The device hung up with no further records.
    #[error("device disconnected")]
    Disconnected,
}

/// Construction options for a [`DeviceSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Wire layout of the device's records.
    ///
    /// Defaults to [`RecordLayout::native`], which on 64-bit targets is the
    /// 24-byte `Wide` layout, not the 16-byte `Compact` one.  Use
    /// [`SessionOptions::compact`] for 32-bit kernels or captured 16-byte
    /// streams.
    pub layout: RecordLayout,
}

impl SessionOptions {
    /// Options for 16-byte records.
    pub fn compact() -> Self {
        Self {
            layout: RecordLayout::Compact,
        }
    }
}

/// Which events a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Pointer events only; valid on any device.
    Pointer,
    /// Pointer and per-slot events; requires a multi-touch device.
    Touch,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pointer" => Ok(DispatchMode::Pointer),
            "touch" => Ok(DispatchMode::Touch),
            other => Err(format!(
                "unknown dispatch mode '{other}' (expected pointer or touch)"
            )),
        }
    }
}

/// Cooperative stop signal for a running session.
///
/// Cloned handles share one flag.  The loop checks it before each wait, after
/// each wake-up and between records.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Asks the loop to stop at its next check.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`request`](Self::request) has been called.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Records decoded from the stream.
    pub records: u64,
    /// Events delivered to the handler.
    pub events: u64,
    /// Records rejected by the synthesizer.
    pub rejected: u64,
}

/// Adapts a driver to [`std::io::Read`] for the record decoder.
struct DriverStream<'a, D: ?Sized>(&'a mut D);

impl<D: Driver + ?Sized> Read for DriverStream<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// One opened device and its decoding state.
pub struct DeviceSession<D: Driver> {
    driver: D,
    poller: Poller,
    decoder: RecordDecoder,
    synthesizer: EventSynthesizer,
    pending: Vec<TouchEvent>,
    shutdown: ShutdownHandle,
    stats: SessionStats,
}

impl<D: Driver> DeviceSession<D> {
    /// Binds `driver` to a readiness poller.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Poll`] if the descriptor cannot be registered.
    /// The driver is closed before the error is returned.
    pub fn open(mut driver: D, options: SessionOptions) -> Result<Self, SessionError> {
        let poller = match Poller::new(driver.raw_fd()) {
            Ok(p) => p,
            Err(e) => {
                if let Err(close_err) = driver.close() {
                    warn!("closing driver after failed open: {close_err}");
                }
                return Err(e.into());
            }
        };

        info!(
            device = driver.name(),
            class = %driver.device_class(),
            slots = driver.slot_count(),
            layout = ?options.layout,
            "device session opened"
        );

        let slots = driver.slot_count();
        Ok(Self {
            driver,
            poller,
            decoder: RecordDecoder::new(options.layout),
            synthesizer: EventSynthesizer::new(slots),
            pending: Vec::new(),
            shutdown: ShutdownHandle::default(),
            stats: SessionStats::default(),
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        self.driver.name()
    }

    pub fn device_class(&self) -> DeviceClass {
        self.driver.device_class()
    }

    pub fn slot_count(&self) -> usize {
        self.driver.slot_count()
    }

    /// Current pointer position.
    pub fn position(&self) -> Point {
        self.synthesizer.state().position()
    }

    /// Read-only view of the position and slot state.
    pub fn state(&self) -> &TouchState {
        self.synthesizer.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Returns a handle that stops this session when requested.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Runs the dispatch loop until shutdown or a fatal error, delivering each
    /// event to `handler` on the calling thread.
    ///
    /// Consumes the session; the driver is closed on every exit path.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnsupportedOperation`] if `mode` is
    ///   [`DispatchMode::Touch`] and the device is not multi-touch.
    /// - [`SessionError::Record`], [`SessionError::Poll`] or
    ///   [`SessionError::Disconnected`] when the loop fails.
    /// - [`SessionError::Driver`] if the driver fails to close after an
    ///   otherwise clean exit.
    pub fn run<F>(mut self, mode: DispatchMode, mut handler: F) -> Result<SessionStats, SessionError>
    where
        F: FnMut(&DeviceSession<D>, TouchEvent),
    {
        let outcome = self
            .prepare(mode)
            .and_then(|()| self.dispatch(&mut handler));
        let stats = self.stats;
        let closed = self.close();

        match outcome {
            Ok(()) => {
                closed?;
                info!(
                    records = stats.records,
                    events = stats.events,
                    rejected = stats.rejected,
                    "device session finished"
                );
                Ok(stats)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("closing driver after failed run: {close_err}");
                }
                error!("device session ended: {e}");
                Err(e)
            }
        }
    }

    /// Validates `mode` against the device and sizes the slot table.
    fn prepare(&mut self, mode: DispatchMode) -> Result<(), SessionError> {
        match mode {
            DispatchMode::Touch => {
                if self.device_class() != DeviceClass::Multitouch {
                    return Err(SessionError::UnsupportedOperation(format!(
                        "touch dispatch requires a multitouch device, '{}' is {}",
                        self.name(),
                        self.device_class()
                    )));
                }
                if self.slot_count() == 0 {
                    return Err(SessionError::UnsupportedOperation(format!(
                        "touch dispatch requires slots, '{}' reports none",
                        self.name()
                    )));
                }
            }
            DispatchMode::Pointer => {
                self.synthesizer = EventSynthesizer::new(0);
            }
        }
        debug!(?mode, "dispatch mode validated");
        Ok(())
    }

    fn dispatch<F>(&mut self, handler: &mut F) -> Result<(), SessionError>
    where
        F: FnMut(&DeviceSession<D>, TouchEvent),
    {
        loop {
            if self.shutdown.is_requested() {
                debug!("shutdown requested before wait");
                return Ok(());
            }

            let readiness = self.poller.wait()?;
            if self.shutdown.is_requested() {
                debug!("shutdown requested during wait");
                return Ok(());
            }
            if readiness.is_empty() {
                continue;
            }

            let drained = self.drain(handler)?;
            if readiness.hang_up && drained == 0 {
                return Err(SessionError::Disconnected);
            }
        }
    }

    /// Decodes every available record, delivering events as each is processed.
    /// Returns the number of records decoded.
    fn drain<F>(&mut self, handler: &mut F) -> Result<usize, SessionError>
    where
        F: FnMut(&DeviceSession<D>, TouchEvent),
    {
        let mut drained = 0;

        while !self.shutdown.is_requested() {
            let Some(record) = self
                .decoder
                .next_record(&mut DriverStream(&mut self.driver))?
            else {
                break;
            };
            drained += 1;
            self.stats.records += 1;

            if let Err(e) = self.synthesizer.process(&record, &mut self.pending) {
                self.stats.rejected += 1;
                match e {
                    SynthesisError::InvalidSlot { .. } => warn!("record rejected: {e}"),
                    SynthesisError::UnrecognizedRecord { .. } => debug!("record rejected: {e}"),
                    SynthesisError::UnsupportedOperation(_) => trace!("record rejected: {e}"),
                }
                continue;
            }

            let mut events = std::mem::take(&mut self.pending);
            for event in events.drain(..) {
                self.stats.events += 1;
                handler(&*self, event);
            }
            self.pending = events;
        }

        trace!(drained, pending = self.decoder.pending_bytes(), "drain complete");
        Ok(drained)
    }

    /// Releases the poller and closes the driver.
    fn close(self) -> Result<(), SessionError> {
        let Self {
            mut driver, poller, ..
        } = self;
        drop(poller);
        driver.close()?;
        debug!(device = driver.name(), "device session closed");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
