//! Gesture event engine: turns per-frame hand-landmark detections into
//! input commands.
//!
//! Per cycle: first detected hand -> confidence gate -> finger/pinch
//! latches -> scroll or cursor motion. Everything here is synchronous and
//! non-blocking; a rejected or missing frame simply yields no commands
//! for that cycle.

pub mod cache;
pub mod classify;
pub mod debounce;
pub mod dispatch;
pub mod scroll;
pub mod smooth;

use anyhow::{Context, Result, anyhow};
use log::debug;
use std::time::{Duration, Instant};

use crate::config::{Profile, Thresholds};
use crate::detector::DetectionResult;
use crate::landmarks::INDEX_TIP;
use cache::HandStateCache;
use debounce::Debouncer;
use dispatch::ControlMap;
use scroll::ScrollTracker;
use smooth::CursorFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            other => Err(anyhow!("unknown mouse button: {other}")),
        }
    }
}

/// Abstract command stream consumed by the OS-input sink. Emitted per
/// cycle, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    KeyDown(String),
    KeyUp(String),
    MoveTo { x: i32, y: i32 },
    MouseButton { button: MouseButton, down: bool },
    Scroll { amount: i32, horizontal: bool },
}

pub struct GestureEngine {
    map: ControlMap,
    cache: HandStateCache,
    debounce: Debouncer,
    filter: CursorFilter,
    scroll: ScrollTracker,
    th: Thresholds,
}

impl GestureEngine {
    /// Builds the engine from a validated profile. Configuration errors
    /// (unknown gesture/finger/landmark names, bad actions) surface here,
    /// once, before any frame is processed.
    pub fn new(profile: &Profile) -> Result<Self> {
        let map =
            ControlMap::from_bindings(&profile.bindings).context("invalid gesture bindings")?;
        let th = profile.thresholds.clone();
        let mut debounce = Debouncer::new(Duration::from_millis(th.min_dwell_ms));
        let now = Instant::now();
        for key in map.latch_keys() {
            debounce.register(&key, now);
        }
        let filter = CursorFilter::new(th.smooth_alpha, profile.screen.width, profile.screen.height);
        Ok(Self {
            map,
            cache: HandStateCache::new(),
            debounce,
            filter,
            scroll: ScrollTracker::new(),
            th,
        })
    }

    /// One control-loop cycle. Only the first detected hand is ever
    /// considered (single-hand authoritative; extra hands are ignored,
    /// not merged). A cycle whose frame was rejected emits nothing and
    /// leaves every latch and filter untouched.
    pub fn on_cycle(&mut self, result: Option<DetectionResult>, now: Instant) -> Vec<Command> {
        let frame = result
            .and_then(|mut r| {
                if r.hands.is_empty() {
                    None
                } else {
                    Some(r.hands.swap_remove(0))
                }
            })
            .and_then(|hand| hand.into_frame());

        if !self.cache.update(frame, self.th.min_hand_score) {
            return Vec::new();
        }
        let Some(state) = self.cache.state() else {
            return Vec::new();
        };

        let mut cmds = Vec::new();

        for binding in &self.map.finger_actions {
            match classify::finger_extended(state, binding.finger, self.th.extension_margin) {
                Ok(extended) => {
                    if let Some(edge) = self.debounce.observe(&binding.latch, extended, now) {
                        cmds.push(binding.action.command(edge));
                    }
                }
                Err(e) => debug!("finger classification skipped: {e}"),
            }
        }

        if let Some(action) = &self.map.pinch_action {
            match classify::pinch(state, self.th.pinch_max_dist, self.th.pinch_min_score) {
                Ok(active) => {
                    if let Some(edge) = self.debounce.observe("pinch", active, now) {
                        cmds.push(action.command(edge));
                    }
                }
                Err(e) => debug!("pinch classification skipped: {e}"),
            }
        }

        let scroll_active = !self.map.scroll_fingers.is_empty()
            && classify::fingers_extended(state, &self.map.scroll_fingers, self.th.extension_margin)
                .unwrap_or(false);

        let pointer = self.map.cursor_landmark.unwrap_or(INDEX_TIP);
        if let Some(p) = state.points.get(pointer).copied() {
            if scroll_active {
                if let Some(delta) = self.scroll.update(p.x, p.y, self.th.scroll_gain) {
                    let amount = delta.amount.round() as i32;
                    if amount != 0 {
                        cmds.push(Command::Scroll {
                            amount,
                            horizontal: delta.horizontal,
                        });
                    }
                }
            } else {
                self.scroll.reset();
                if self.map.cursor_landmark.is_some() {
                    let (x, y) = self.filter.filter(p.x, p.y);
                    cmds.push(Command::MoveTo { x, y });
                }
            }
        }

        cmds
    }

    /// Force-release every active latch. Called when command injection is
    /// switched off: a press that was already applied must still get its
    /// matching release, otherwise the virtual key or button stays down
    /// for as long as the daemon runs. Inactive latches emit nothing.
    pub fn release_all(&mut self, now: Instant) -> Vec<Command> {
        let mut cmds = Vec::new();
        for binding in &self.map.finger_actions {
            if let Some(edge) = self.debounce.observe(&binding.latch, false, now) {
                cmds.push(binding.action.command(edge));
            }
        }
        if let Some(action) = &self.map.pinch_action {
            if let Some(edge) = self.debounce.observe("pinch", false, now) {
                cmds.push(action.command(edge));
            }
        }
        self.scroll.reset();
        cmds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Detector, Meta, Profile, Screen};
    use crate::detector::WireHand;
    use crate::landmarks::{
        INDEX_PIP, Landmark, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, THUMB_IP, THUMB_TIP,
    };
    use std::collections::HashMap;

    fn profile(bindings: &[(&str, &str)]) -> Profile {
        Profile {
            meta: Meta {
                name: Some("test".to_string()),
            },
            thresholds: Thresholds {
                min_hand_score: 0.5,
                pinch_min_score: 0.3,
                smooth_alpha: 0.2,
                pinch_max_dist: 0.04,
                extension_margin: 0.0,
                scroll_gain: 10.0,
                min_dwell_ms: 0,
            },
            screen: Screen {
                width: 1000,
                height: 1000,
            },
            detector: Detector {
                command: vec!["true".to_string()],
            },
            bindings: bindings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    /// A relaxed open hand: fingertips curled (tip below reference),
    /// each finger in its own x column so thumb and index tips sit well
    /// apart and nothing pinches.
    fn base_hand(score: f32) -> WireHand {
        let mut lm = vec![Landmark::default(); 21];
        for (i, (reference, tip)) in [
            (THUMB_IP, THUMB_TIP),
            (INDEX_PIP, crate::landmarks::INDEX_TIP),
            (MIDDLE_PIP, MIDDLE_TIP),
            (crate::landmarks::RING_PIP, crate::landmarks::RING_TIP),
            (PINKY_PIP, PINKY_TIP),
        ]
        .into_iter()
        .enumerate()
        {
            let x = 0.3 + 0.1 * i as f32;
            lm[reference] = Landmark { x, y: 0.5, z: 0.0 };
            lm[tip] = Landmark { x, y: 0.6, z: 0.0 };
        }
        WireHand {
            landmarks: lm,
            score,
            handedness: "Right".to_string(),
        }
    }

    fn detection(hand: WireHand) -> Option<DetectionResult> {
        Some(DetectionResult { hands: vec![hand] })
    }

    #[test]
    fn held_pinch_clicks_once_and_releases_once() {
        let mut engine = GestureEngine::new(&profile(&[("pinch", "mouse:left")])).unwrap();
        let t0 = Instant::now();

        let mut pinched = base_hand(0.9);
        pinched.landmarks[THUMB_TIP] = Landmark {
            x: 0.50,
            y: 0.50,
            z: 0.0,
        };
        pinched.landmarks[crate::landmarks::INDEX_TIP] = Landmark {
            x: 0.51,
            y: 0.50,
            z: 0.0,
        };

        let mut presses = 0;
        for i in 0..5 {
            let cmds = engine.on_cycle(detection(pinched.clone()), t0 + Duration::from_millis(i));
            presses += cmds
                .iter()
                .filter(|c| {
                    matches!(
                        c,
                        Command::MouseButton {
                            button: MouseButton::Left,
                            down: true
                        }
                    )
                })
                .count();
        }
        assert_eq!(presses, 1);

        let cmds = engine.on_cycle(detection(base_hand(0.9)), t0 + Duration::from_millis(10));
        assert_eq!(
            cmds,
            vec![Command::MouseButton {
                button: MouseButton::Left,
                down: false
            }]
        );
    }

    #[test]
    fn rejected_frame_emits_nothing_and_holds_latches() {
        let mut engine =
            GestureEngine::new(&profile(&[("finger.pinky", "mouse:right")])).unwrap();
        let t0 = Instant::now();

        let mut extended = base_hand(0.9);
        extended.landmarks[PINKY_TIP] = Landmark {
            x: 0.5,
            y: 0.3,
            z: 0.0,
        };

        let cmds = engine.on_cycle(detection(extended.clone()), t0);
        assert_eq!(
            cmds,
            vec![Command::MouseButton {
                button: MouseButton::Right,
                down: true
            }]
        );

        // low-confidence frame with the pinky curled: gated out, no release
        let mut curled = base_hand(0.2);
        curled.landmarks[PINKY_TIP] = Landmark {
            x: 0.5,
            y: 0.7,
            z: 0.0,
        };
        assert!(engine
            .on_cycle(detection(curled), t0 + Duration::from_millis(1))
            .is_empty());
        assert!(engine.on_cycle(None, t0 + Duration::from_millis(2)).is_empty());

        // steady extended pinky after recovery: no duplicate press
        assert!(engine
            .on_cycle(detection(extended), t0 + Duration::from_millis(3))
            .is_empty());
    }

    #[test]
    fn cursor_moves_unless_scroll_gesture_is_active() {
        let mut engine = GestureEngine::new(&profile(&[
            ("cursor", "move:index_tip"),
            ("scroll", "fingers:index+middle"),
        ]))
        .unwrap();
        let t0 = Instant::now();

        let cmds = engine.on_cycle(detection(base_hand(0.9)), t0);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], Command::MoveTo { .. }));

        // extend index + middle: scroll mode, first sample only baselines
        let mut scrolling = base_hand(0.9);
        for tip in [crate::landmarks::INDEX_TIP, MIDDLE_TIP] {
            scrolling.landmarks[tip] = Landmark {
                x: 0.6,
                y: 0.4,
                z: 0.0,
            };
        }
        let cmds = engine.on_cycle(detection(scrolling.clone()), t0 + Duration::from_millis(1));
        assert!(cmds.is_empty(), "baseline cycle must not move or scroll");

        // move the hand up while scrolling: positive vertical scroll
        for tip in [crate::landmarks::INDEX_TIP, MIDDLE_TIP] {
            scrolling.landmarks[tip] = Landmark {
                x: 0.6,
                y: 0.2,
                z: 0.0,
            };
        }
        let cmds = engine.on_cycle(detection(scrolling), t0 + Duration::from_millis(2));
        assert_eq!(
            cmds,
            vec![Command::Scroll {
                amount: 2,
                horizontal: false
            }]
        );
    }

    #[test]
    fn release_all_flushes_active_latches_exactly_once() {
        let mut engine = GestureEngine::new(&profile(&[
            ("finger.thumb", "key:space"),
            ("pinch", "mouse:left"),
        ]))
        .unwrap();
        let t0 = Instant::now();

        // thumb extended (tip left of its reference on x) and pinching
        let mut hand = base_hand(0.9);
        hand.landmarks[THUMB_TIP] = Landmark {
            x: 0.20,
            y: 0.50,
            z: 0.0,
        };
        hand.landmarks[crate::landmarks::INDEX_TIP] = Landmark {
            x: 0.21,
            y: 0.50,
            z: 0.0,
        };
        let cmds = engine.on_cycle(detection(hand.clone()), t0);
        assert!(cmds.contains(&Command::KeyDown("space".to_string())));
        assert!(cmds.contains(&Command::MouseButton {
            button: MouseButton::Left,
            down: true
        }));

        // injection switched off mid-press: both releases must come out now
        let cmds = engine.release_all(t0 + Duration::from_millis(1));
        assert!(cmds.contains(&Command::KeyUp("space".to_string())));
        assert!(cmds.contains(&Command::MouseButton {
            button: MouseButton::Left,
            down: false
        }));
        assert_eq!(cmds.len(), 2);

        // already released: a second flush is a no-op
        assert!(engine.release_all(t0 + Duration::from_millis(2)).is_empty());

        // the gesture held across the disabled window presses again cleanly
        let cmds = engine.on_cycle(detection(hand), t0 + Duration::from_millis(3));
        assert!(cmds.contains(&Command::KeyDown("space".to_string())));
    }

    #[test]
    fn only_the_first_hand_is_considered() {
        let mut engine = GestureEngine::new(&profile(&[("pinch", "mouse:left")])).unwrap();
        let t0 = Instant::now();

        let mut second = base_hand(0.9);
        second.landmarks[THUMB_TIP] = Landmark {
            x: 0.50,
            y: 0.50,
            z: 0.0,
        };
        second.landmarks[crate::landmarks::INDEX_TIP] = Landmark {
            x: 0.51,
            y: 0.50,
            z: 0.0,
        };
        let result = DetectionResult {
            hands: vec![base_hand(0.9), second],
        };

        // the pinching hand is second in the result: ignored
        assert!(engine.on_cycle(Some(result), t0).is_empty());
    }

    #[test]
    fn bad_bindings_fail_at_construction() {
        assert!(GestureEngine::new(&profile(&[("wave", "key:w")])).is_err());
    }
}
