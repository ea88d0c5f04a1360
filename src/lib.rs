//! # Treadle
//!
//! **Treadle** is a single-threaded cooperative concurrency runtime for Rust,
//! designed as a small task orchestration layer for network services that need
//! many concurrent logical flows without one OS thread per flow.
//!
//! Unlike general-purpose runtimes built around `Future`, Treadle keeps the
//! yield/resume protocol explicit: a task is a resumable state machine
//! ([`Fiber`]) that suspends by returning a [`Wait`] request and is resumed
//! with exactly the value produced by the awaited condition. Everything is
//! multiplexed over one epoll instance on one thread, offering:
//!
//! - A **cooperative scheduler** with an explicit run → yield → resume →
//!   finish lifecycle and join semantics between tasks
//! - **I/O readiness and timer waits** driven by a single reactor
//! - **Asynchronous name resolution** backed by a worker pool sharing one
//!   completion channel across any number of in-flight queries
//! - A **stop protocol** (`stop`, `stop_after`) that ends the loop after the
//!   current pass has drained its already-fired wake-ups
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use treadle::{Resume, Runtime, Scope, Step, Wait};
//! use std::time::Duration;
//!
//! fn tick(_scope: &mut Scope<'_>, input: Resume) -> Result<Step, treadle::Fault> {
//!     match input {
//!         Resume::Start(_) => Ok(Step::Wait(Wait::Timeout(Duration::from_millis(100)))),
//!         _ => {
//!             println!("tick!");
//!             Ok(Step::Done(Vec::new()))
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), treadle::Error> {
//!     let mut rt = Runtime::new()?;
//!     rt.attach(tick, Vec::new());
//!     rt.run()
//! }
//! ```
//!
//! ## Entry points
//!
//! - [`Runtime`] — owns the reactor, the resolver, and the task set
//! - [`Scope`] — operations available to a running task (`attach`,
//!   `attach_wait`, `resolve`, `stop`)
//! - [`Resolution`] — the normalized output of a successful name lookup

mod error;
mod reactor;
mod resolver;
mod runtime;
mod utils;

pub use error::{Error, Fault};
pub use resolver::Resolution;
pub use runtime::Runtime;
pub use runtime::builder::RuntimeBuilder;
pub use runtime::scope::Scope;
pub use runtime::task::{Fiber, Resume, State, Step, TaskId, Values, Wait};
