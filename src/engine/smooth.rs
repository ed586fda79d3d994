//! Cursor motion smoothing: EMA over normalized coordinates, then mirror
//! and map into screen pixels.

/// Exponential moving average filter for pointer motion. Alpha closer to
/// 1 tracks faster but jitters more; for constant input the output
/// converges to the target with ratio `1 - alpha` per cycle.
#[derive(Debug)]
pub struct CursorFilter {
    prev: Option<(f32, f32)>,
    alpha: f32,
    screen_w: f32,
    screen_h: f32,
}

impl CursorFilter {
    pub fn new(alpha: f32, screen_w: u32, screen_h: u32) -> Self {
        Self {
            prev: None,
            alpha,
            screen_w: screen_w as f32,
            screen_h: screen_h as f32,
        }
    }

    /// Seed from a known pointer position (normalized) instead of the
    /// first sample.
    pub fn with_seed(alpha: f32, screen_w: u32, screen_h: u32, x: f32, y: f32) -> Self {
        let mut filter = Self::new(alpha, screen_w, screen_h);
        filter.prev = Some((x, y));
        filter
    }

    /// Smooth one normalized sample and map it to screen pixels. The very
    /// first sample seeds the filter directly, avoiding a jump from an
    /// arbitrary start position. The camera presents a mirror image, so x
    /// is flipped.
    pub fn filter(&mut self, x: f32, y: f32) -> (i32, i32) {
        let (sx, sy) = match self.prev {
            None => (x, y),
            Some((px, py)) => (
                self.alpha * x + (1.0 - self.alpha) * px,
                self.alpha * y + (1.0 - self.alpha) * py,
            ),
        };
        self.prev = Some((sx, sy));
        let screen_x = ((1.0 - sx) * self.screen_w) as i32;
        let screen_y = (sy * self.screen_h) as i32;
        (screen_x, screen_y)
    }

    pub fn smoothed(&self) -> Option<(f32, f32)> {
        self.prev
    }
}
