use winit::window::Window;

use crate::coords::{to_pixels_floor, LogicalPosition, LogicalSize, PixelRect};
use crate::device::{Gpu, OutputTarget};
use crate::scheduler::{Scheduler, WidgetRef};

/// Handles a page gets during its callbacks.
pub struct PageCtx<'a> {
    pub window: &'a Window,
    pub scheduler: &'a mut Scheduler<Gpu>,
}

impl PageCtx<'_> {
    /// Logical size of the page.
    pub fn logical_size(&self) -> LogicalSize<f64> {
        self.window.inner_size().to_logical(self.window.scale_factor())
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Where a widget sits on the page.
#[derive(Clone)]
pub struct Placement {
    pub widget: WidgetRef<OutputTarget>,
    /// Top-left corner of the widget box in logical pixels.
    pub origin: LogicalPosition<f64>,
}

impl Placement {
    pub fn new(widget: WidgetRef<OutputTarget>, origin: LogicalPosition<f64>) -> Self {
        Self { widget, origin }
    }

    /// Widget box in physical page pixels for a box of `size`.
    pub fn physical_rect(&self, size: LogicalSize<f64>, scale_factor: f64) -> PixelRect {
        PixelRect::new(
            to_pixels_floor(self.origin.x * scale_factor),
            to_pixels_floor(self.origin.y * scale_factor),
            to_pixels_floor(size.width * scale_factor),
            to_pixels_floor(size.height * scale_factor),
        )
    }
}
