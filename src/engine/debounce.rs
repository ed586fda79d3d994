//! Edge-triggered latches: continuous boolean predicates in, at most one
//! press per rise and one release per fall out.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

#[derive(Debug)]
struct GestureLatch {
    active: bool,
    last_change: Instant,
}

/// One latch per tracked control, keyed by latch name. `min_dwell` is an
/// anti-flicker option: a rise is only honored once the latch has sat in
/// its current state that long. Releases are never dwell-suppressed —
/// a delayed release is a stuck key.
#[derive(Debug)]
pub struct Debouncer {
    latches: HashMap<String, GestureLatch>,
    min_dwell: Duration,
}

impl Debouncer {
    pub fn new(min_dwell: Duration) -> Self {
        Self {
            latches: HashMap::new(),
            min_dwell,
        }
    }

    /// Create a latch up front (inactive). Latches are created at engine
    /// construction and live for the whole session.
    pub fn register(&mut self, key: &str, now: Instant) {
        self.latches.entry(key.to_string()).or_insert(GestureLatch {
            active: false,
            last_change: now,
        });
    }

    /// Feed the current predicate value for `key`. Steady state yields
    /// nothing; a transition yields exactly one edge.
    pub fn observe(&mut self, key: &str, value: bool, now: Instant) -> Option<Edge> {
        let latch = self.latches.entry(key.to_string()).or_insert(GestureLatch {
            active: false,
            last_change: now,
        });
        if value == latch.active {
            return None;
        }
        if value {
            if now.duration_since(latch.last_change) < self.min_dwell {
                return None;
            }
            latch.active = true;
            latch.last_change = now;
            Some(Edge::Pressed)
        } else {
            latch.active = false;
            latch.last_change = now;
            Some(Edge::Released)
        }
    }
}
