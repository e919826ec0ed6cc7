use crate::coords::{to_pixels_floor, LogicalSize, PhysicalSize, PixelRect};
use crate::time::FrameTime;

use super::backend::OutputSurface;
use super::widget::WidgetRef;

/// Why a frame drew nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameSkip {
    /// No working GPU context (construction failed or disposed).
    NoRenderer,
    /// The context was lost; waiting for the host to reset.
    ContextLost,
    /// An immersive session owns the GPU surface.
    Presenting,
}

/// Outcome of one `render` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub time: FrameTime,
    pub widgets_drawn: usize,
    pub surfaces_copied: usize,
    pub skipped: Option<FrameSkip>,
}

impl FrameReport {
    pub(crate) fn new(time: FrameTime) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub(crate) fn skipped(mut self, reason: FrameSkip) -> Self {
        self.skipped = Some(reason);
        self
    }
}

/// Bottom-left anchored viewport of a scene inside the shared buffer.
///
/// The viewport hugs the top edge of the buffer so that, in top-left
/// coordinates, every widget's pixels start at the origin. The result is
/// clamped to `buffer` and never negative.
pub fn viewport_for(
    scene: LogicalSize<f64>,
    pixel_ratio: f64,
    buffer: PhysicalSize<u32>,
) -> PixelRect {
    let width = to_pixels_floor(scene.width * pixel_ratio).min(buffer.width);
    let height = to_pixels_floor(scene.height * pixel_ratio).min(buffer.height);
    PixelRect::new(0, buffer.height - height, width, height)
}

/// Draw order for one frame: invisible widgets first, then visible ones.
///
/// Hidden widgets pre-warm before anything user-visible is drawn, and a
/// visible widget always overwrites whatever they left on the shared surface.
/// Registration order is kept within each group.
pub(crate) fn frame_order<O>(widgets: &[WidgetRef<O>]) -> Vec<WidgetRef<O>>
where
    O: OutputSurface + 'static,
{
    let (visible, hidden): (Vec<_>, Vec<_>) = widgets
        .iter()
        .cloned()
        .partition(|w| w.try_borrow().map(|w| w.is_visible()).unwrap_or(false));
    hidden.into_iter().chain(visible).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::TestWidget;
    use crate::scheduler::widget::HostId;

    #[test]
    fn viewport_is_anchored_to_the_top_edge() {
        let vp = viewport_for(LogicalSize::new(100.0, 50.0), 2.0, PhysicalSize::new(400, 300));
        assert_eq!(vp, PixelRect::new(0, 200, 200, 100));
        assert_eq!(vp.flipped(300), PixelRect::new(0, 0, 200, 100));
    }

    #[test]
    fn viewport_is_clamped_to_the_buffer() {
        let vp = viewport_for(LogicalSize::new(500.0, 500.0), 1.0, PhysicalSize::new(300, 200));
        assert_eq!(vp, PixelRect::new(0, 0, 300, 200));
    }

    #[test]
    fn viewport_tolerates_pathological_ratios() {
        let buffer = PhysicalSize::new(300, 200);
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let vp = viewport_for(LogicalSize::new(100.0, 100.0), ratio, buffer);
            assert!(vp.is_empty() || vp == PixelRect::new(0, 0, 300, 200));
            assert!(vp.top() <= buffer.height);
        }
    }

    #[test]
    fn viewport_in_zero_buffer_is_empty() {
        let vp = viewport_for(LogicalSize::new(100.0, 100.0), 1.0, PhysicalSize::new(0, 0));
        assert!(vp.is_empty());
    }

    #[test]
    fn order_puts_hidden_widgets_first() {
        let (a, _) = TestWidget::new(1, 10.0, 10.0).into_ref();
        let (b, _) = TestWidget::new(2, 10.0, 10.0).hidden().into_ref();
        let (c, _) = TestWidget::new(3, 10.0, 10.0).into_ref();
        let (d, _) = TestWidget::new(4, 10.0, 10.0).hidden().into_ref();

        let hosts: Vec<HostId> = frame_order(&[a, b, c, d])
            .iter()
            .map(|w| w.borrow().host())
            .collect();
        assert_eq!(hosts, vec![HostId(2), HostId(4), HostId(1), HostId(3)]);
    }
}
