use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::engine::dispatch::ControlMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// Tuning knobs for the gesture engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// Acceptance confidence for the hand-state cache.
    pub min_hand_score: f32,
    /// Classifier-internal confidence bar for pinch evaluation.
    #[serde(default = "default_pinch_score")]
    pub pinch_min_score: f32,
    /// EMA factor in (0,1]; closer to 1 = faster, jitterier cursor.
    pub smooth_alpha: f32,
    /// Pinch distance threshold in normalized image units.
    pub pinch_max_dist: f32,
    /// Hysteresis margin for finger-extension comparisons.
    #[serde(default)]
    pub extension_margin: f32,
    /// Normalized-motion to scroll-steps gain.
    pub scroll_gain: f32,
    /// Minimum dwell before a press is honored; 0 disables debounce.
    #[serde(default)]
    pub min_dwell_ms: u64,
}

fn default_pinch_score() -> f32 {
    0.3
}

#[derive(Debug, Clone, Deserialize)]
pub struct Screen {
    #[serde(default = "default_screen_w")]
    pub width: u32,
    #[serde(default = "default_screen_h")]
    pub height: u32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: default_screen_w(),
            height: default_screen_h(),
        }
    }
}

fn default_screen_w() -> u32 {
    1920
}
fn default_screen_h() -> u32 {
    1080
}

/// The external landmark-detector collaborator: a process that writes one
/// JSON detection result per line on stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct Detector {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    pub thresholds: Thresholds,
    #[serde(default)]
    pub screen: Screen,
    pub detector: Detector,

    // Accept nested/dotted tables and flatten them into "a.b" -> "value"
    #[serde(deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

// --------- custom bindings deserializer (tolerant) ----------
fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {:?}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::value::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => {
                flatten_table(&key, sub, out)?;
            }
            other => {
                return Err(format!(
                    "binding '{}' value must be a string, got {}",
                    key,
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DaemonConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> PathBuf {
    let home = UserDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    home.join(".config").join("handctl")
}

fn profiles_dir() -> PathBuf {
    config_dir().join("profiles")
}

fn active_ptr_path() -> PathBuf {
    config_dir().join("active")
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DaemonConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir();
        let profdir = profiles_dir();
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = active_ptr_path();
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = Self::load_profile(&active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = Self::load_profile(&self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.reload()?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                if let Some(ext) = e.path().extension() {
                    if ext == "toml" {
                        if let Some(stem) = e.path().file_stem().and_then(|s| s.to_str()) {
                            v.push(stem.to_string());
                        }
                    }
                }
            }
        }
        v.sort();
        v
    }

    fn load_profile(name: &str) -> Result<Profile> {
        let path = profiles_dir().join(format!("{name}.toml"));
        let txt = fs::read_to_string(&path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        let profile: Profile =
            toml::from_str(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let uinput_ok = Path::new("/dev/uinput").exists();
        let in_input_group = check_in_input_group();
        serde_json::json!({
            "uinput_present": uinput_ok,
            "input_group_member": in_input_group,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "detector_command": self.profile.detector.command,
            "hints": {
                "udev_rule": "/etc/udev/rules.d/80-uinput.rules",
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

pub fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    if !(0.0..=1.0).contains(&th.min_hand_score) {
        return Err(anyhow!("thresholds.min_hand_score must be in [0,1]"));
    }
    if !(0.0..=1.0).contains(&th.pinch_min_score) {
        return Err(anyhow!("thresholds.pinch_min_score must be in [0,1]"));
    }
    if !(th.smooth_alpha > 0.0 && th.smooth_alpha <= 1.0) {
        return Err(anyhow!("thresholds.smooth_alpha must be in (0,1]"));
    }
    if th.pinch_max_dist <= 0.0 {
        return Err(anyhow!(
            "thresholds.pinch_max_dist must be positive (normalized units)"
        ));
    }
    if th.extension_margin < 0.0 {
        return Err(anyhow!("thresholds.extension_margin must be >= 0"));
    }
    if th.scroll_gain <= 0.0 {
        return Err(anyhow!("thresholds.scroll_gain must be positive"));
    }
    if p.screen.width == 0 || p.screen.height == 0 {
        return Err(anyhow!("screen dimensions must be positive"));
    }
    if p.detector.command.is_empty() {
        return Err(anyhow!("detector.command must name a detector process"));
    }

    // resolve the whole gesture table now so unknown names fail at load,
    // not mid-session
    ControlMap::from_bindings(&p.bindings)?;
    Ok(())
}

fn check_in_input_group() -> bool {
    if let Ok(s) = fs::read_to_string("/etc/group") {
        let user = whoami::username();
        for line in s.lines() {
            if line.starts_with("input:") {
                if line
                    .split(':')
                    .nth(3)
                    .unwrap_or("")
                    .split(',')
                    .any(|u| u == user)
                {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Profile> {
        let profile: Profile = toml::from_str(text).map_err(|e| anyhow!("{e}"))?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    const GOOD: &str = r#"
        [meta]
        name = "test"

        [thresholds]
        min_hand_score = 0.5
        smooth_alpha = 0.2
        pinch_max_dist = 0.04
        scroll_gain = 400.0

        [detector]
        command = ["hand-landmarkd", "--stream"]

        [bindings]
        cursor = "move:index_tip"
        pinch = "mouse:left"

        [bindings.finger]
        thumb = "key:space"
    "#;

    #[test]
    fn parses_and_flattens_nested_bindings() {
        let p = parse(GOOD).unwrap();
        assert_eq!(
            p.bindings.get("finger.thumb").map(String::as_str),
            Some("key:space")
        );
        assert_eq!(p.thresholds.pinch_min_score, 0.3); // default
        assert_eq!(p.thresholds.min_dwell_ms, 0); // default
        assert_eq!(p.screen.width, 1920); // default
    }

    #[test]
    fn profile_screen_overrides_the_default() {
        let text = format!("{GOOD}\n[screen]\nwidth = 3440\nheight = 1440\n");
        let p = parse(&text).unwrap();
        assert_eq!((p.screen.width, p.screen.height), (3440, 1440));
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(parse(&GOOD.replace("smooth_alpha = 0.2", "smooth_alpha = 0.0")).is_err());
        assert!(parse(&GOOD.replace("min_hand_score = 0.5", "min_hand_score = 1.5")).is_err());
        assert!(parse(&GOOD.replace("scroll_gain = 400.0", "scroll_gain = -1.0")).is_err());
    }

    #[test]
    fn rejects_unknown_gesture_binding_at_load() {
        assert!(parse(&GOOD.replace("thumb = \"key:space\"", "sixth = \"key:space\"")).is_err());
    }

    #[test]
    fn rejects_empty_detector_command() {
        assert!(parse(&GOOD.replace("[\"hand-landmarkd\", \"--stream\"]", "[]")).is_err());
    }
}
