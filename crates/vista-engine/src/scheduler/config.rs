use anyhow::{ensure, Result};

/// Tuning of the frame-time control loop.
///
/// Durations are in milliseconds. `low_frame_ms` and `high_frame_ms` straddle
/// the frame budget; the gap between them is the hysteresis band in which the
/// scale is left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Below this smoothed frame duration the scale is raised.
    pub low_frame_ms: f64,

    /// Above this smoothed frame duration the scale is lowered.
    pub high_frame_ms: f64,

    /// Multiplicative scale step, in `(0, 1)`.
    pub scale_step: f64,

    /// Lower bound of the resolution scale, in `(0, 1]`.
    pub min_scale: f64,

    /// Weight of the newest frame in the smoothed average, in `(0, 1]`.
    pub decay: f64,

    /// Largest change of the smoothed average caused by one frame.
    pub max_average_step_ms: f64,
}

impl SchedulerConfig {
    /// Average the clock is reset to after every scale change.
    pub fn neutral_frame_ms(&self) -> f64 {
        (self.low_frame_ms + self.high_frame_ms) / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.low_frame_ms.is_finite() && self.low_frame_ms > 0.0,
            "low_frame_ms must be positive, got {}",
            self.low_frame_ms
        );
        ensure!(
            self.high_frame_ms.is_finite() && self.high_frame_ms > self.low_frame_ms,
            "high_frame_ms ({}) must exceed low_frame_ms ({})",
            self.high_frame_ms,
            self.low_frame_ms
        );
        ensure!(
            self.scale_step > 0.0 && self.scale_step < 1.0,
            "scale_step must be in (0, 1), got {}",
            self.scale_step
        );
        ensure!(
            self.min_scale > 0.0 && self.min_scale <= 1.0,
            "min_scale must be in (0, 1], got {}",
            self.min_scale
        );
        ensure!(
            self.decay > 0.0 && self.decay <= 1.0,
            "decay must be in (0, 1], got {}",
            self.decay
        );
        ensure!(
            self.max_average_step_ms.is_finite() && self.max_average_step_ms > 0.0,
            "max_average_step_ms must be positive, got {}",
            self.max_average_step_ms
        );
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            low_frame_ms: 18.0,
            high_frame_ms: 26.0,
            scale_step: 0.79,
            min_scale: 0.5,
            decay: 0.2,
            max_average_step_ms: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        SchedulerConfig::default().validate().unwrap();
        assert_eq!(SchedulerConfig::default().neutral_frame_ms(), 22.0);
    }

    #[test]
    fn inverted_band_is_rejected() {
        let config = SchedulerConfig {
            low_frame_ms: 30.0,
            high_frame_ms: 20.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("high_frame_ms"));
    }

    #[test]
    fn unit_step_is_rejected() {
        let config = SchedulerConfig {
            scale_step: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_min_scale_is_rejected() {
        let config = SchedulerConfig {
            min_scale: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
