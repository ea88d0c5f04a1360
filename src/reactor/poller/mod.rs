//! Platform-specific I/O poller abstraction.
//!
//! The poller is the thin layer between the reactor and the OS event
//! multiplexer. It knows how to:
//! - register and deregister file descriptors with read/write interests,
//! - block until readiness is reported or a timeout expires,
//! - translate raw OS events into [`Event`](crate::reactor::event::Event)s.
//!
//! The concrete implementation is selected at compile time depending on
//! the target operating system. Only one poller exists per runtime
//! instance; multiplexing across several reactors is out of scope.

pub(crate) mod common;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;
