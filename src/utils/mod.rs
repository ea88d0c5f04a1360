//! Internal utilities shared across the runtime.

mod arena;

pub(crate) use arena::{Arena, Key};
