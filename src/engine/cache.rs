//! Last-accepted-frame cache: the freshness gate between the detector and
//! everything downstream.

use crate::landmarks::LandmarkFrame;

/// Holds the last frame whose score met the acceptance threshold.
/// Stale-but-valid: a rejected or missing frame leaves the cached state
/// untouched, so consumers keep working off the previous cycle's data.
#[derive(Debug, Default)]
pub struct HandStateCache {
    state: Option<LandmarkFrame>,
}

impl HandStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` iff `frame` was accepted and now backs the cache.
    /// Downstream consumers must not treat cached landmarks as fresh on a
    /// cycle where this returned `false`.
    pub fn update(&mut self, frame: Option<LandmarkFrame>, threshold: f32) -> bool {
        match frame {
            Some(f) if f.score >= threshold => {
                self.state = Some(f);
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> Option<&LandmarkFrame> {
        self.state.as_ref()
    }
}
