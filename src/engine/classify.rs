//! Pure geometric gesture predicates over a cached landmark frame.
//!
//! All functions are stateless: the frame comes in by reference and the
//! answer comes out, which keeps them independently testable and safe to
//! call from anywhere in the cycle.

use thiserror::Error;

use crate::landmarks::{Finger, INDEX_TIP, LANDMARK_COUNT, LandmarkFrame, THUMB_TIP};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GestureError {
    /// Configuration error: the caller asked for a finger that is not in
    /// the static table. Distinct from a transient no-data condition.
    #[error("unknown finger name '{0}'")]
    UnknownFinger(String),
    /// Transient: fewer than 21 landmarks are cached. Only possible
    /// before the first accepted frame.
    #[error("classifier needs 21 landmarks, cache holds {0}")]
    InsufficientLandmarks(usize),
}

fn require_full(frame: &LandmarkFrame) -> Result<(), GestureError> {
    if frame.points.len() < LANDMARK_COUNT {
        return Err(GestureError::InsufficientLandmarks(frame.points.len()));
    }
    Ok(())
}

/// A finger counts as extended when its tip lies strictly beyond its
/// reference point in the direction away from the palm. Image-space y
/// grows downward and the camera is mirrored, so numerically that is
/// `tip < reference` on the finger's axis. `margin` widens or narrows
/// the comparison so a fingertip hovering at the boundary does not
/// flicker.
///
/// The thumb's lateral-x comparison is the documented palm-facing
/// behavior; it is known to be unreliable with the back of the hand
/// toward the camera.
pub fn finger_extended(
    frame: &LandmarkFrame,
    finger: Finger,
    margin: f32,
) -> Result<bool, GestureError> {
    require_full(frame)?;
    let def = finger.def();
    let tip = frame.points[def.tip].on_axis(def.axis);
    let reference = frame.points[def.reference].on_axis(def.axis);
    Ok(tip < reference - margin)
}

/// Logical AND of `finger_extended` over a set; used for the scroll
/// gesture (index + middle held out together).
pub fn fingers_extended(
    frame: &LandmarkFrame,
    fingers: &[Finger],
    margin: f32,
) -> Result<bool, GestureError> {
    for finger in fingers {
        if !finger_extended(frame, *finger, margin)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Thumb-tip to index-tip distance in the 2-D image plane. Gated by a
/// classifier-internal score bar, independent of the cache's acceptance
/// threshold: a pinch may be evaluated at a different confidence bar
/// than basic tracking.
pub fn pinch(frame: &LandmarkFrame, max_dist: f32, min_score: f32) -> Result<bool, GestureError> {
    require_full(frame)?;
    if frame.score < min_score {
        return Ok(false);
    }
    let thumb = frame.points[THUMB_TIP];
    let index = frame.points[INDEX_TIP];
    let dx = thumb.x - index.x;
    let dy = thumb.y - index.y;
    Ok((dx * dx + dy * dy).sqrt() < max_dist)
}
