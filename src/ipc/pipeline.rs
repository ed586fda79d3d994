//! The control loop: polls the detector's latest-result slot, drives the
//! gesture engine, and applies the resulting commands to the input sink.

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use std::thread;

use crate::actions::UinputSink;
use crate::config::Profile;
use crate::detector::DetectorSource;
use crate::engine::GestureEngine;

/// Shared handles between the IPC server and the pipeline thread.
#[derive(Clone)]
pub struct PipelineControls {
    pub profile: Arc<Mutex<Profile>>,
    /// Bumped on every profile change; the pipeline rebuilds its engine
    /// when it notices a new generation.
    pub generation: Arc<AtomicU64>,
    /// Gates command application without tearing the pipeline down.
    pub enabled: Arc<AtomicBool>,
}

impl PipelineControls {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile: Arc::new(Mutex::new(profile)),
            generation: Arc::new(AtomicU64::new(0)),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn swap_profile(&self, profile: Profile) {
        if let Ok(mut p) = self.profile.lock() {
            *p = profile;
        }
        self.generation.fetch_add(1, Ordering::Release);
    }
}

const TICK: Duration = Duration::from_millis(5);

pub fn run_pipeline(ctl: PipelineControls) -> Result<()> {
    let profile = ctl
        .profile
        .lock()
        .map_err(|_| anyhow::anyhow!("profile lock poisoned"))?
        .clone();
    let mut seen_generation = ctl.generation.load(Ordering::Acquire);

    // Collaborator setup is fatal: surfaced before the loop starts.
    let source = DetectorSource::spawn(&profile.detector.command)
        .context("detector collaborator unavailable")?;
    let slot = source.slot();
    let mut sink = UinputSink::new(profile.screen.width, profile.screen.height)
        .context("input-injection collaborator unavailable")?;
    let mut engine = GestureEngine::new(&profile)?;
    let mut detector_cmd = profile.detector.command.clone();
    let mut was_enabled = ctl.enabled.load(Ordering::Relaxed);
    info!("pipeline: engine ready ({} bindings)", profile.bindings.len());

    loop {
        let generation = ctl.generation.load(Ordering::Acquire);
        if generation != seen_generation {
            seen_generation = generation;
            let fresh = match ctl.profile.lock() {
                Ok(p) => p.clone(),
                Err(_) => {
                    error!("pipeline: profile lock poisoned, keeping previous engine");
                    continue;
                }
            };
            match GestureEngine::new(&fresh) {
                Ok(e) => {
                    engine = e;
                    info!("pipeline: engine rebuilt for reloaded profile");
                }
                Err(e) => error!("pipeline: profile rejected, keeping previous engine: {e:#}"),
            }
            if fresh.detector.command != detector_cmd {
                warn!("pipeline: detector.command changed; restart the daemon to apply");
                detector_cmd = fresh.detector.command.clone();
            }
        }

        let enabled = ctl.enabled.load(Ordering::Relaxed);
        if was_enabled && !enabled {
            // a press already applied to the device must still get its
            // release, or the virtual key/button stays down forever
            for cmd in engine.release_all(Instant::now()) {
                if let Err(e) = sink.apply(&cmd) {
                    error!("release flush failed: {e}");
                }
            }
        }
        was_enabled = enabled;

        // drain the slot either way so re-enabling starts from a fresh
        // detection, not a stale one
        let result = slot.take();
        if enabled {
            for cmd in &engine.on_cycle(result, Instant::now()) {
                if let Err(e) = sink.apply(cmd) {
                    error!("input emit failed: {e}");
                }
            }
        }

        thread::sleep(TICK);
    }
}
