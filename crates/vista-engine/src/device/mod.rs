//! wgpu implementation of the shared GPU context.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - owning the shared offscreen surface and the private output surfaces
//! - compositing widgets onto the page surface and presenting it

mod blit;
mod error;
mod gpu;
mod init;
mod surface;
mod target;

pub use error::SurfaceErrorAction;
pub use gpu::{Composite, CompositeSource, Gpu};
pub use init::GpuInit;
pub use target::OutputTarget;
