use winit::dpi::PhysicalSize;

/// Axis-aligned rectangle in physical pixels.
///
/// The origin convention is chosen by the caller. Viewports produced by the
/// scheduler are bottom-left anchored (graphics API convention); use
/// [`PixelRect::flipped`] to convert to the top-left convention wgpu copies and
/// viewports expect.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn right(self) -> u32 {
        self.x.saturating_add(self.width)
    }

    #[inline]
    pub fn top(self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Clamps the rectangle so it lies entirely inside `bounds` (origin 0,0).
    pub fn clamped_to(self, bounds: PhysicalSize<u32>) -> Self {
        let x = self.x.min(bounds.width);
        let y = self.y.min(bounds.height);
        let right = self.right().min(bounds.width);
        let top = self.top().min(bounds.height);
        PixelRect::new(x, y, right - x, top - y)
    }

    /// Mirrors the rectangle vertically inside a surface of `surface_height`.
    ///
    /// Converts bottom-left anchored coordinates to top-left anchored ones and
    /// back. Portions outside the surface are clipped first.
    pub fn flipped(self, surface_height: u32) -> Self {
        let y = self.y.min(surface_height);
        let top = self.top().min(surface_height);
        PixelRect::new(self.x, surface_height - top, self.width, top - y)
    }
}

/// Converts a non-negative logical measurement to whole pixels.
///
/// NaN, infinities and negative values collapse to 0; values beyond `u32`
/// saturate.
#[inline]
pub fn to_pixels_floor(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.floor().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Like [`to_pixels_floor`] but rounds up. Used for buffer allocation so the
/// buffer always covers the largest viewport.
#[inline]
pub fn to_pixels_ceil(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.ceil().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: u32, y: u32, w: u32, h: u32) -> PixelRect {
        PixelRect::new(x, y, w, h)
    }

    // ── clamped_to ────────────────────────────────────────────────────────

    #[test]
    fn clamp_inside_is_identity() {
        let rect = r(2, 4, 10, 20);
        assert_eq!(rect.clamped_to(PhysicalSize::new(100, 100)), rect);
    }

    #[test]
    fn clamp_trims_overhang() {
        let rect = r(0, 90, 150, 20);
        assert_eq!(rect.clamped_to(PhysicalSize::new(100, 100)), r(0, 90, 100, 10));
    }

    #[test]
    fn clamp_outside_is_empty() {
        let rect = r(120, 0, 10, 10);
        let clamped = rect.clamped_to(PhysicalSize::new(100, 100));
        assert!(clamped.is_empty());
        assert_eq!(clamped.x, 100);
    }

    #[test]
    fn clamp_to_zero_surface() {
        assert!(r(0, 0, 10, 10).clamped_to(PhysicalSize::new(0, 0)).is_empty());
    }

    // ── flipped ───────────────────────────────────────────────────────────

    #[test]
    fn flip_top_region_lands_at_origin() {
        // Bottom-left anchored viewport hugging the top edge of a 100px surface.
        let gl = r(0, 60, 50, 40);
        assert_eq!(gl.flipped(100), r(0, 0, 50, 40));
    }

    #[test]
    fn flip_is_an_involution() {
        let rect = r(3, 10, 20, 30);
        assert_eq!(rect.flipped(80).flipped(80), rect);
    }

    #[test]
    fn flip_clips_past_surface() {
        assert_eq!(r(0, 90, 10, 30).flipped(100), r(0, 0, 10, 10));
    }

    // ── pixel conversion ──────────────────────────────────────────────────

    #[test]
    fn pixel_conversion_rejects_pathological_values() {
        assert_eq!(to_pixels_floor(f64::NAN), 0);
        assert_eq!(to_pixels_floor(-3.0), 0);
        assert_eq!(to_pixels_ceil(f64::INFINITY), 0);
        assert_eq!(to_pixels_floor(1e20), u32::MAX);
    }

    #[test]
    fn pixel_conversion_rounds() {
        assert_eq!(to_pixels_floor(10.9), 10);
        assert_eq!(to_pixels_ceil(10.1), 11);
        assert_eq!(to_pixels_ceil(10.0), 10);
    }
}
