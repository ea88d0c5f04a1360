//! Core runtime components.
//!
//! This module contains the scheduler, the loop driver, and the wait
//! dispatcher:
//! - [`core`] owns the task registry and the run → yield → resume →
//!   finish protocol,
//! - [`dispatch`] translates yielded wait requests into reactor or
//!   resolver registrations,
//! - [`scope`] is the operation surface a task sees while running,
//! - [`builder`] configures a runtime before construction.

mod core;
mod dispatch;

pub(crate) mod builder;
pub(crate) mod scope;

pub mod task;

pub use core::Runtime;
