//! Vista engine crate.
//!
//! Drives many independent 3D viewer widgets on one page from a single
//! shared GPU context. The [`scheduler`] owns the frame loop, adaptive
//! resolution and the shared/private display multiplexing; [`device`] is the
//! wgpu backend it renders through; [`window`] and [`core`] host a page of
//! widgets in a winit window.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod scheduler;
pub mod time;
pub mod window;
