//! Pixel geometry shared by the scheduler and the wgpu backend.
//!
//! Logical sizes use `winit::dpi::LogicalSize<f64>`, physical sizes
//! `winit::dpi::PhysicalSize<u32>`. Rectangles inside GPU surfaces are
//! [`PixelRect`]s; their origin convention is documented at each use site.

mod rect;

pub use rect::{to_pixels_ceil, to_pixels_floor, PixelRect};
pub use winit::dpi::{LogicalPosition, LogicalSize, PhysicalSize};
