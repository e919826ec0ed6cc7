use super::SchedulerConfig;

/// Hysteresis loop on the global resolution scale.
///
/// The scale only moves when the smoothed frame duration leaves the
/// `[low, high]` band, and always stays within `[min_scale, 1]`.
#[derive(Debug, Clone)]
pub struct ScaleController {
    scale: f64,
    low: f64,
    high: f64,
    step: f64,
    min_scale: f64,
}

impl ScaleController {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            scale: 1.0,
            low: config.low_frame_ms,
            high: config.high_frame_ms,
            step: config.scale_step,
            min_scale: config.min_scale,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Feeds the smoothed frame duration. Returns the new scale when it changed.
    pub fn adjust(&mut self, average_ms: f64) -> Option<f64> {
        let mut scale = self.scale;
        if average_ms > self.high && scale > self.min_scale {
            scale *= self.step;
        } else if average_ms < self.low && scale < 1.0 {
            scale = (scale / self.step).min(1.0);
        }
        let scale = scale.clamp(self.min_scale, 1.0);

        if scale == self.scale {
            return None;
        }

        self.scale = scale;
        Some(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ScaleController {
        ScaleController::new(&SchedulerConfig::default())
    }

    #[test]
    fn inside_band_is_stable() {
        let mut c = controller();
        assert_eq!(c.adjust(22.0), None);
        assert_eq!(c.adjust(18.0), None);
        assert_eq!(c.adjust(26.0), None);
        assert_eq!(c.scale(), 1.0);
    }

    #[test]
    fn slow_frames_step_down_geometrically_to_floor() {
        let mut c = controller();
        let mut seen = vec![c.scale()];
        for _ in 0..10 {
            if let Some(scale) = c.adjust(40.0) {
                seen.push(scale);
            }
        }
        assert_eq!(seen.len(), 4);
        assert!((seen[1] - 0.79).abs() < 1e-9);
        assert!((seen[2] - 0.6241).abs() < 1e-9);
        assert_eq!(seen[3], 0.5);
        assert_eq!(c.scale(), 0.5);
    }

    #[test]
    fn fast_frames_step_up_and_cap_at_one() {
        let mut c = controller();
        c.adjust(40.0);
        c.adjust(40.0);
        assert!(c.scale() < 0.7);

        let up = c.adjust(10.0).unwrap();
        assert!((up - 0.79).abs() < 1e-9);
        assert_eq!(c.adjust(10.0), Some(1.0));
        assert_eq!(c.adjust(10.0), None);
    }

    #[test]
    fn scale_stays_in_range_for_any_sequence() {
        let mut c = controller();
        let averages = [40.0, 5.0, 100.0, 100.0, 100.0, 1.0, 27.0, 17.0, 1e9, -3.0, f64::NAN];
        for avg in averages.iter().cycle().take(200) {
            c.adjust(*avg);
            assert!(c.scale() >= 0.5 && c.scale() <= 1.0);
        }
    }
}
