//! Hand landmark model: frame snapshots and the static finger table.
//!
//! Landmark indices follow the 21-point hand-landmarker convention
//! (0 = wrist … 20 = pinky tip). Coordinates are camera-normalized:
//! x/y in [0,1], z is relative depth.

use serde::Deserialize;

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Resolve a landmark name from a profile binding into its index.
pub fn index_of(name: &str) -> Option<usize> {
    let idx = match name {
        "wrist" => WRIST,
        "thumb_tip" => THUMB_TIP,
        "index_tip" => INDEX_TIP,
        "middle_tip" => MIDDLE_TIP,
        "ring_tip" => RING_TIP,
        "pinky_tip" => PINKY_TIP,
        _ => return None,
    };
    Some(idx)
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn on_axis(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// One accepted-or-candidate detection snapshot. Immutable after creation.
#[derive(Debug, Clone)]
pub struct LandmarkFrame {
    pub points: Vec<Landmark>,
    pub score: f32,
}

impl LandmarkFrame {
    /// x/y outside [0,1] are clamped at this boundary so everything
    /// downstream can rely on normalized coordinates.
    pub fn from_points(mut points: Vec<Landmark>, score: f32) -> Self {
        for p in &mut points {
            p.x = p.x.clamp(0.0, 1.0);
            p.y = p.y.clamp(0.0, 1.0);
        }
        Self { points, score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

/// Per-finger comparison pair. The thumb abducts laterally on an upright
/// palm, so it compares on x; the other four curl vertically and compare
/// on y.
#[derive(Debug, Clone, Copy)]
pub struct FingerDef {
    pub reference: usize,
    pub tip: usize,
    pub axis: Axis,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Name resolution happens once, at the configuration boundary.
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "thumb" => Finger::Thumb,
            "index" => Finger::Index,
            "middle" => Finger::Middle,
            "ring" => Finger::Ring,
            "pinky" => Finger::Pinky,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }

    pub fn def(self) -> FingerDef {
        match self {
            Finger::Thumb => FingerDef {
                reference: THUMB_IP,
                tip: THUMB_TIP,
                axis: Axis::X,
            },
            Finger::Index => FingerDef {
                reference: INDEX_PIP,
                tip: INDEX_TIP,
                axis: Axis::Y,
            },
            Finger::Middle => FingerDef {
                reference: MIDDLE_PIP,
                tip: MIDDLE_TIP,
                axis: Axis::Y,
            },
            Finger::Ring => FingerDef {
                reference: RING_PIP,
                tip: RING_TIP,
                axis: Axis::Y,
            },
            Finger::Pinky => FingerDef {
                reference: PINKY_PIP,
                tip: PINKY_TIP,
                axis: Axis::Y,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finger_names_round_trip() {
        for f in Finger::ALL {
            assert_eq!(Finger::from_name(f.name()), Some(f));
        }
        assert_eq!(Finger::from_name("palm"), None);
    }

    #[test]
    fn thumb_compares_on_x_others_on_y() {
        assert_eq!(Finger::Thumb.def().axis, Axis::X);
        for f in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
            assert_eq!(f.def().axis, Axis::Y);
        }
    }

    #[test]
    fn frame_clamps_out_of_range_coordinates() {
        let frame = LandmarkFrame::from_points(
            vec![Landmark {
                x: 1.4,
                y: -0.2,
                z: -0.7,
            }],
            0.9,
        );
        assert_eq!(frame.points[0].x, 1.0);
        assert_eq!(frame.points[0].y, 0.0);
        // z is unconstrained relative depth
        assert_eq!(frame.points[0].z, -0.7);
    }
}
