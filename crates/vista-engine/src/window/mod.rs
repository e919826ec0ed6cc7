//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the page window, and wires them to the
//! shared GPU context and the scheduler.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
