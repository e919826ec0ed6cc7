//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the runtime (platform loop)
//! and the host page that mounts viewer widgets.

mod app;
mod ctx;

pub use app::{AppControl, Page};
pub use ctx::{PageCtx, Placement};
