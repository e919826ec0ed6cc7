/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameTime {
    /// Timestamp passed to the tick, in milliseconds.
    pub t: f64,

    /// Time elapsed since the previous tick, in milliseconds.
    pub delta: f64,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock driven by host timestamps.
///
/// Besides the raw delta it maintains an exponentially weighted average frame
/// duration. Every update moves the average by at most `max_step` ms, so a
/// single outlier frame (GC pause, tab switch) cannot swing it far.
///
/// Timestamps come from the host's animation callback, so the first tick has
/// no baseline: its delta is 0 and the average is left alone.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<f64>,
    frame_index: u64,
    average: f64,
    decay: f64,
    max_step: f64,
}

impl FrameClock {
    /// Creates a clock whose average starts at `initial_average` ms.
    pub fn new(initial_average: f64, decay: f64, max_step: f64) -> Self {
        debug_assert!(decay > 0.0 && decay <= 1.0);
        debug_assert!(max_step > 0.0);
        Self {
            last: None,
            frame_index: 0,
            average: initial_average,
            decay,
            max_step,
        }
    }

    /// Smoothed frame duration in milliseconds.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Overrides the smoothed average (used after a scale change to restart
    /// from a neutral baseline).
    pub fn reset_average(&mut self, average: f64) {
        self.average = average;
    }

    /// Advances the clock to `t` and returns a new `FrameTime`.
    pub fn tick(&mut self, t: f64) -> FrameTime {
        let delta = match self.last {
            // Non-monotonic host timestamps count as a zero-length frame.
            Some(last) if t.is_finite() && t >= last => t - last,
            _ => 0.0,
        };

        if self.last.is_some() {
            self.observe(delta);
        }
        if t.is_finite() {
            self.last = Some(t);
        }

        let ft = FrameTime {
            t,
            delta,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }

    fn observe(&mut self, delta: f64) {
        let step = (self.decay * (delta - self.average)).clamp(-self.max_step, self.max_step);
        self.average += step;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(22.0, 0.2, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_delta_and_keeps_average() {
        let mut clock = FrameClock::default();
        let ft = clock.tick(1_000.0);
        assert_eq!(ft.delta, 0.0);
        assert_eq!(ft.frame_index, 0);
        assert_eq!(clock.average(), 22.0);
    }

    #[test]
    fn delta_is_difference_of_timestamps() {
        let mut clock = FrameClock::default();
        clock.tick(100.0);
        let ft = clock.tick(116.5);
        assert!((ft.delta - 16.5).abs() < 1e-9);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn average_moves_at_most_max_step_per_frame() {
        let mut clock = FrameClock::new(22.0, 0.2, 2.0);
        let mut t = 0.0;
        clock.tick(t);
        for delta in [500.0, 0.0, 10_000.0, 1.0, 16.0, 90.0] {
            let before = clock.average();
            t += delta;
            clock.tick(t);
            assert!((clock.average() - before).abs() <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn small_deviation_uses_decay() {
        let mut clock = FrameClock::new(20.0, 0.2, 2.0);
        clock.tick(0.0);
        clock.tick(25.0);
        // 0.2 * (25 - 20) = 1.0, below the cap.
        assert!((clock.average() - 21.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_timestamp_is_a_zero_frame() {
        let mut clock = FrameClock::default();
        clock.tick(100.0);
        let ft = clock.tick(50.0);
        assert_eq!(ft.delta, 0.0);
    }

    #[test]
    fn reset_average_overrides_baseline() {
        let mut clock = FrameClock::default();
        clock.reset_average(40.0);
        assert_eq!(clock.average(), 40.0);
    }
}
