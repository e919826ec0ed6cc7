use crate::coords::{to_pixels_ceil, LogicalSize, PhysicalSize};

use super::backend::{OutputSurface, RenderBackend};
use super::registry::{SchedulerHandle, SurfaceLayout};
use super::widget::WidgetRef;

/// Keeps the shared drawing buffer at the bounding box of all widgets.
///
/// The buffer is only reallocated when the largest logical width, height or
/// the device pixel ratio actually changed.
#[derive(Debug, Clone)]
pub struct SizeNegotiator {
    width: f64,
    height: f64,
    dpr: f64,
    /// Set when the stored size no longer reflects the allocation.
    stale: bool,
}

impl SizeNegotiator {
    pub fn new(dpr: f64) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            dpr,
            stale: false,
        }
    }

    /// Largest logical size over all widgets at the last negotiation.
    pub fn logical_size(&self) -> LogicalSize<f64> {
        LogicalSize::new(self.width, self.height)
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Forces the next negotiation to reallocate.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Buffer size for the current state.
    pub fn buffer_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(
            to_pixels_ceil(self.width * self.dpr),
            to_pixels_ceil(self.height * self.dpr),
        )
    }

    /// Display box of every surface for `scale`.
    pub fn display_size(&self, scale: f64) -> LogicalSize<f64> {
        LogicalSize::new(self.width / scale, self.height / scale)
    }

    /// Recomputes the bounding box. Returns `true` when the shared buffer
    /// must be reallocated.
    pub fn negotiate<O>(&mut self, dpr: f64, widgets: &[WidgetRef<O>]) -> bool
    where
        O: OutputSurface + 'static,
    {
        let dpr_changed = dpr != self.dpr;
        if dpr_changed {
            for widget in widgets {
                if let Ok(mut w) = widget.try_borrow_mut() {
                    w.recompute_size();
                }
            }
        }

        let (mut width, mut height) = (0.0f64, 0.0f64);
        for widget in widgets {
            let Ok(w) = widget.try_borrow() else { continue };
            let size = w.scene().size();
            if size.width.is_finite() {
                width = width.max(size.width);
            }
            if size.height.is_finite() {
                height = height.max(size.height);
            }
        }

        if !self.stale && !dpr_changed && width == self.width && height == self.height {
            return false;
        }

        self.width = width;
        self.height = height;
        self.dpr = dpr;
        self.stale = false;
        true
    }

    /// Applies the negotiated size to the backend and every widget surface.
    pub(crate) fn apply<B: RenderBackend>(
        &self,
        scale: f64,
        backend: &mut B,
        registry: &SchedulerHandle<B::Output>,
        widgets: &[WidgetRef<B::Output>],
    ) {
        let buffer = self.buffer_size();
        let display = self.display_size(scale);

        log::debug!(
            "shared buffer {}x{} (logical {:.0}x{:.0} @ dpr {})",
            buffer.width,
            buffer.height,
            self.width,
            self.height,
            self.dpr
        );

        backend.resize_shared(buffer);
        backend.set_shared_display_size(display);
        registry.set_layout(SurfaceLayout { buffer, display });

        for widget in widgets {
            let Ok(mut w) = widget.try_borrow_mut() else { continue };
            let output = w.output_mut();
            output.set_size(buffer);
            output.set_display_size(display);
            // The backing store was just invalidated.
            w.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::TestWidget;

    #[test]
    fn bounding_box_is_max_over_widgets() {
        let a = TestWidget::new(1, 200.0, 100.0).into_ref();
        let b = TestWidget::new(2, 120.0, 300.0).into_ref();
        let mut size = SizeNegotiator::new(2.0);

        assert!(size.negotiate(2.0, &[a.0, b.0]));
        assert_eq!(size.logical_size(), LogicalSize::new(200.0, 300.0));
        assert_eq!(size.buffer_size(), PhysicalSize::new(400, 600));
    }

    #[test]
    fn unchanged_inputs_are_a_no_op() {
        let (w, _) = TestWidget::new(1, 200.0, 100.0).into_ref();
        let mut size = SizeNegotiator::new(1.0);
        let widgets = [w];

        assert!(size.negotiate(1.0, &widgets));
        assert!(!size.negotiate(1.0, &widgets));
        assert!(!size.negotiate(1.0, &widgets));
    }

    #[test]
    fn dpr_change_forces_widgets_to_remeasure() {
        let (w, probe) = TestWidget::new(1, 200.0, 100.0).into_ref();
        let mut size = SizeNegotiator::new(1.0);
        let widgets = [w];
        size.negotiate(1.0, &widgets);
        assert_eq!(probe.borrow().recompute_calls, 0);

        assert!(size.negotiate(1.5, &widgets));
        assert_eq!(probe.borrow().recompute_calls, 1);
        assert_eq!(size.buffer_size(), PhysicalSize::new(300, 150));
    }

    #[test]
    fn invalidate_forces_reallocation() {
        let (w, _) = TestWidget::new(1, 50.0, 50.0).into_ref();
        let mut size = SizeNegotiator::new(1.0);
        let widgets = [w];
        size.negotiate(1.0, &widgets);
        size.invalidate();
        assert!(size.negotiate(1.0, &widgets));
        assert!(!size.negotiate(1.0, &widgets));
    }

    #[test]
    fn display_size_divides_by_scale() {
        let (w, _) = TestWidget::new(1, 200.0, 100.0).into_ref();
        let mut size = SizeNegotiator::new(1.0);
        size.negotiate(1.0, &[w]);
        assert_eq!(size.display_size(0.5), LogicalSize::new(400.0, 200.0));
    }

    #[test]
    fn empty_registry_negotiates_to_zero() {
        let mut size = SizeNegotiator::new(1.0);
        let none: [WidgetRef<crate::scheduler::testing::FakeOutput>; 0] = [];
        assert!(!size.negotiate(1.0, &none));
        assert_eq!(size.buffer_size(), PhysicalSize::new(0, 0));
    }
}
