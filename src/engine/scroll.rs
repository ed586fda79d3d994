//! Relative-motion scroll tracking with dominant-axis selection.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollDelta {
    pub amount: f32,
    pub horizontal: bool,
}

/// Strictly incremental: every sample re-anchors the baseline, so the
/// emitted delta is motion since the previous sample, never distance from
/// an absolute anchor.
#[derive(Debug, Default)]
pub struct ScrollTracker {
    baseline: Option<(f32, f32)>,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// First sample establishes the reference and emits nothing. After
    /// that, the axis with the larger movement wins; the sign is flipped
    /// so moving the hand up scrolls up.
    pub fn update(&mut self, x: f32, y: f32, gain: f32) -> Option<ScrollDelta> {
        let (px, py) = self.baseline.replace((x, y))?;
        let dx = x - px;
        let dy = y - py;
        if dy.abs() > dx.abs() {
            Some(ScrollDelta {
                amount: -dy * gain,
                horizontal: false,
            })
        } else {
            Some(ScrollDelta {
                amount: -dx * gain,
                horizontal: true,
            })
        }
    }

    /// Forget the baseline; the next sample re-anchors. Called when the
    /// scroll gesture deactivates so re-entry does not replay old motion.
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn first_sample_only_sets_baseline() {
        let mut tracker = ScrollTracker::new();
        assert!(tracker.update(0.5, 0.5, 10.0).is_none());
    }

    #[test]
    fn vertical_motion_wins_and_baseline_advances() {
        let mut tracker = ScrollTracker::new();
        tracker.update(0.5, 0.5, 10.0);

        let delta = tracker.update(0.5, 0.3, 10.0).unwrap();
        assert!(!delta.horizontal);
        // dy = -0.2, amount = -dy * gain = +2.0 (scroll up)
        assert!(close(delta.amount, 2.0), "got {}", delta.amount);

        // baseline moved to (0.5, 0.3): repeating the sample is a zero delta
        let delta = tracker.update(0.5, 0.3, 10.0).unwrap();
        assert!(close(delta.amount, 0.0));
    }

    #[test]
    fn horizontal_motion_wins_on_larger_dx() {
        let mut tracker = ScrollTracker::new();
        tracker.update(0.5, 0.5, 10.0);
        let delta = tracker.update(0.8, 0.6, 10.0).unwrap();
        assert!(delta.horizontal);
        assert!(close(delta.amount, -3.0), "got {}", delta.amount);
    }

    #[test]
    fn reset_forgets_the_baseline() {
        let mut tracker = ScrollTracker::new();
        tracker.update(0.5, 0.5, 10.0);
        tracker.reset();
        assert!(tracker.update(0.1, 0.9, 10.0).is_none());
    }
}
