//! Detector collaborator: subprocess wire format and latest-result handoff.
//!
//! The landmark detector is an external process (configured per profile)
//! that writes one JSON detection result per line on stdout. A reader
//! thread parses each line and publishes it into a single-slot cell; the
//! control loop polls the slot at its own cadence. Latest value wins —
//! in-flight results that were never consumed are overwritten, not queued,
//! because only the most recent frame is meaningful for interactive
//! control.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::landmarks::{LANDMARK_COUNT, Landmark, LandmarkFrame};

#[derive(Debug, Clone, Deserialize)]
pub struct WireHand {
    pub landmarks: Vec<Landmark>,
    pub score: f32,
    #[serde(default)]
    pub handedness: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub hands: Vec<WireHand>,
}

impl WireHand {
    /// A hand with fewer than 21 points never reaches the cache.
    pub fn into_frame(self) -> Option<LandmarkFrame> {
        if self.landmarks.len() < LANDMARK_COUNT {
            debug!(
                "dropped hand with {} of {LANDMARK_COUNT} landmarks",
                self.landmarks.len()
            );
            return None;
        }
        Some(LandmarkFrame::from_points(self.landmarks, self.score))
    }
}

/// Single-writer single-reader handoff cell. `publish` overwrites whatever
/// is pending; `take` empties the slot so a cycle with no new detection
/// sees `None` and the engine holds its previous state.
#[derive(Debug, Default)]
pub struct LatestSlot {
    cell: Mutex<Option<DetectionResult>>,
}

impl LatestSlot {
    pub fn publish(&self, result: DetectionResult) {
        if let Ok(mut guard) = self.cell.lock() {
            *guard = Some(result);
        }
    }

    pub fn take(&self) -> Option<DetectionResult> {
        self.cell.lock().ok().and_then(|mut guard| guard.take())
    }
}

pub struct DetectorSource {
    slot: Arc<LatestSlot>,
    child: Child,
    _reader: thread::JoinHandle<()>,
}

impl DetectorSource {
    /// Launches the detector process and the stdout reader thread.
    /// Failure here is fatal: it is surfaced before the control loop
    /// starts, never retried from inside the engine.
    pub fn spawn(command: &[String]) -> Result<Self> {
        let (prog, args) = command
            .split_first()
            .context("detector.command is empty")?;
        let mut child = Command::new(prog)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch detector '{prog}'"))?;
        let stdout = child
            .stdout
            .take()
            .context("detector stdout unavailable")?;
        info!("detector: launched '{prog}' (pid={})", child.id());

        let slot = Arc::new(LatestSlot::default());
        let writer = slot.clone();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!("detector stream error: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<DetectionResult>(&line) {
                    Ok(result) => writer.publish(result),
                    Err(e) => debug!("dropped malformed detector line: {e}"),
                }
            }
            info!("detector stream ended");
        });

        Ok(Self {
            slot,
            child,
            _reader: reader,
        })
    }

    pub fn slot(&self) -> Arc<LatestSlot> {
        self.slot.clone()
    }
}

impl Drop for DetectorSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(n: usize, score: f32) -> WireHand {
        WireHand {
            landmarks: vec![Landmark::default(); n],
            score,
            handedness: "Right".to_string(),
        }
    }

    #[test]
    fn latest_slot_overwrites_and_empties_on_take() {
        let slot = LatestSlot::default();
        slot.publish(DetectionResult {
            hands: vec![hand(21, 0.5)],
        });
        slot.publish(DetectionResult {
            hands: vec![hand(21, 0.9)],
        });

        let got = slot.take().expect("slot should hold the newest result");
        assert_eq!(got.hands[0].score, 0.9);
        assert!(slot.take().is_none(), "take must empty the slot");
    }

    #[test]
    fn short_hand_is_rejected_at_the_wire() {
        assert!(hand(20, 0.99).into_frame().is_none());
        assert!(hand(21, 0.99).into_frame().is_some());
    }

    #[test]
    fn wire_format_parses_detector_output() {
        let line = r#"{"hands":[{"landmarks":[{"x":0.5,"y":0.5,"z":0.0}],"score":0.97,"handedness":"Left"}]}"#;
        let result: DetectionResult = serde_json::from_str(line).unwrap();
        assert_eq!(result.hands.len(), 1);
        assert_eq!(result.hands[0].handedness, "Left");

        let empty: DetectionResult = serde_json::from_str(r#"{"hands":[]}"#).unwrap();
        assert!(empty.hands.is_empty());
    }
}
