//! Runtime error taxonomy.
//!
//! Errors fall into two families:
//! - faults that abort the loop (`Init`, `Reactor`, and by default `Task`),
//! - faults that are fatal only to the offending task (`Protocol`, `Usage`).
//!
//! A failed name lookup is deliberately *not* represented here: it is
//! delivered to the waiting task as the `Err` payload of
//! [`Resume::Resolved`](crate::Resume::Resolved), the same way a successful
//! lookup is delivered, and never raised as a fault.

use std::io;

use thiserror::Error;

/// An error produced inside a task's own logic.
///
/// Faults propagate through the scheduler to the caller of
/// [`Runtime::run`](crate::Runtime::run) unless per-task fault isolation is
/// enabled on the builder.
pub type Fault = Box<dyn std::error::Error>;

/// Errors reported by the runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A platform facility (epoll instance, eventfd, worker thread) could
    /// not be created. Construction-time, fatal.
    #[error("failed to initialize runtime facility: {0}")]
    Init(#[source] io::Error),

    /// The event multiplexer failed while the loop was running. Fatal,
    /// aborts the loop with no retry.
    #[error("event multiplexer failure: {0}")]
    Reactor(#[source] io::Error),

    /// A task yielded a malformed wait request. Fatal to the offending
    /// task only; other tasks are unaffected.
    #[error("malformed wait request: {0}")]
    Protocol(String),

    /// A context-restricted operation was misused, e.g. a join wait that
    /// was not produced by `attach_wait`. Surfaced immediately, fatal to
    /// the offending task only.
    #[error("misuse of context-restricted operation: {0}")]
    Usage(String),

    /// A task faulted. Aborts the loop unless fault isolation is enabled.
    #[error("task fault: {0}")]
    Task(Fault),
}
