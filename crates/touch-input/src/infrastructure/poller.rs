//! Readiness multiplexer built on Linux `epoll`.
//!
//! A [`Poller`] watches exactly one descriptor (the device stream) and blocks,
//! with no timeout, until the kernel reports it readable, hung up, or in error.
//!
//! # What is epoll? (for beginners)
//!
//! `epoll` is the Linux facility for "sleep until one of these descriptors has
//! something for me".  Usage is three calls:
//!
//! 1. `epoll_create1` returns a new epoll descriptor (an interest list).
//! 2. `epoll_ctl(EPOLL_CTL_ADD, fd, EPOLLIN)` registers `fd` for readability.
//! 3. `epoll_wait` blocks until a registered descriptor becomes ready and
//!    reports which events fired.
//!
//! The thread sleeps inside `epoll_wait` without using CPU.  A signal delivered
//! to the thread makes `epoll_wait` return early with `EINTR`; [`Poller::wait`]
//! reports that as an empty [`Readiness`] so the caller can check for shutdown
//! and wait again.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use thiserror::Error;
use tracing::trace;

/// Maximum events fetched per `epoll_wait` call.
const MAX_POLL_EVENTS: usize = 32;

/// Error type for readiness operations.
#[derive(Debug, Error)]
pub enum PollError {
    /// `epoll_create1` failed.
    #[error("failed to create epoll instance: {0}")]
    Create(#[source] io::Error),

    /// The descriptor could not be registered.
    #[error("failed to register descriptor {fd} for readiness: {source}")]
    Register {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    /// `epoll_wait` failed for a reason other than `EINTR`.
    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),
}

/// What a wait observed on the registered descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Data can be read without blocking.
    pub readable: bool,
    /// The peer hung up or the descriptor is in an error state.
    pub hang_up: bool,
}

impl Readiness {
    /// Returns `true` when the wait returned without any event (interrupted).
    pub fn is_empty(&self) -> bool {
        !self.readable && !self.hang_up
    }
}

/// An epoll instance bound to one descriptor.
#[derive(Debug)]
pub struct Poller {
    epoll: OwnedFd,
    fd: RawFd,
}

impl Poller {
    /// Creates an epoll instance and registers `fd` for readability.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Create`] or [`PollError::Register`].
    pub fn new(fd: RawFd) -> Result<Self, PollError> {
        // SAFETY: epoll_create1 takes no pointers; a negative return is checked.
        let raw = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if raw < 0 {
            return Err(PollError::Create(io::Error::last_os_error()));
        }
        // SAFETY: `raw` is a freshly created descriptor that nothing else owns.
        let epoll = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut event = libc::epoll_event {
            events: (libc::EPOLLIN | libc::EPOLLRDHUP) as u32,
            u64: fd as u64,
        };
        // SAFETY: `event` is a valid epoll_event that outlives the call.
        let rc = unsafe { libc::epoll_ctl(epoll.as_raw_fd(), libc::EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(PollError::Register {
                fd,
                source: io::Error::last_os_error(),
            });
        }

        trace!(fd, epoll = epoll.as_raw_fd(), "descriptor registered");
        Ok(Self { epoll, fd })
    }

    /// The registered descriptor.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Blocks until the registered descriptor is ready.
    ///
    /// Returns an empty [`Readiness`] when interrupted by a signal.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Wait`] for any failure other than `EINTR`.
    pub fn wait(&self) -> Result<Readiness, PollError> {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; MAX_POLL_EVENTS];
        // SAFETY: `events` is a writable array of MAX_POLL_EVENTS entries; a
        // timeout of -1 blocks until an event or a signal arrives.
        let n = unsafe {
            libc::epoll_wait(
                self.epoll.as_raw_fd(),
                events.as_mut_ptr(),
                MAX_POLL_EVENTS as libc::c_int,
                -1,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                trace!("readiness wait interrupted");
                return Ok(Readiness::default());
            }
            return Err(PollError::Wait(err));
        }

        let mut readiness = Readiness::default();
        for event in &events[..n as usize] {
            // Copy out of the (packed on x86_64) struct before use.
            let (flags, token) = (event.events, event.u64);
            if token != self.fd as u64 {
                continue;
            }
            readiness.readable |= flags & libc::EPOLLIN as u32 != 0;
            readiness.hang_up |=
                flags & (libc::EPOLLHUP | libc::EPOLLRDHUP | libc::EPOLLERR) as u32 != 0;
        }
        Ok(readiness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_register_invalid_descriptor_fails() {
        let result = Poller::new(-1);
        assert!(matches!(result, Err(PollError::Register { fd: -1, .. })));
    }

    #[test]
    fn test_wait_reports_readable_after_write() {
        // Arrange
        let (reader, mut writer) = UnixStream::pair().expect("pair");
        let poller = Poller::new(reader.as_raw_fd()).expect("poller");

        // Act
        writer.write_all(b"x").expect("write");
        let readiness = poller.wait().expect("wait");

        // Assert
        assert!(readiness.readable);
        assert!(!readiness.hang_up);
        assert_eq!(poller.fd(), reader.as_raw_fd());
    }

    #[test]
    fn test_wait_reports_hang_up_when_peer_closes() {
        let (reader, writer) = UnixStream::pair().expect("pair");
        let poller = Poller::new(reader.as_raw_fd()).expect("poller");

        drop(writer);
        let readiness = poller.wait().expect("wait");

        assert!(readiness.hang_up);
    }

    #[test]
    fn test_empty_readiness() {
        assert!(Readiness::default().is_empty());
        assert!(!Readiness { readable: true, hang_up: false }.is_empty());
    }
}
