//! Gesture-to-command mapping, parsed from the profile's bindings table.
//!
//! Which physical command corresponds to which gesture is configuration,
//! not engine logic. Unknown gesture, finger, or landmark names are
//! rejected here, once, at startup.

use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;

use super::debounce::Edge;
use super::{Command, MouseButton};
use crate::landmarks::{self, Finger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureAction {
    Key(String),
    Mouse(MouseButton),
}

impl GestureAction {
    pub fn command(&self, edge: Edge) -> Command {
        let down = edge == Edge::Pressed;
        match self {
            GestureAction::Key(sym) => {
                if down {
                    Command::KeyDown(sym.clone())
                } else {
                    Command::KeyUp(sym.clone())
                }
            }
            GestureAction::Mouse(button) => Command::MouseButton {
                button: *button,
                down,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct FingerBinding {
    pub finger: Finger,
    pub latch: String,
    pub action: GestureAction,
}

/// Resolved control table. Binding grammar:
///   `finger.<name>` -> `key:<symbol>` | `mouse:<left|right|middle>`
///   `pinch`         -> `key:<symbol>` | `mouse:<button>`
///   `cursor`        -> `move:<landmark_name>`
///   `scroll`        -> `fingers:<name>+<name>...`
#[derive(Debug, Clone, Default)]
pub struct ControlMap {
    pub finger_actions: Vec<FingerBinding>,
    pub pinch_action: Option<GestureAction>,
    pub cursor_landmark: Option<usize>,
    pub scroll_fingers: Vec<Finger>,
}

impl ControlMap {
    pub fn from_bindings(bindings: &HashMap<String, String>) -> Result<Self> {
        let mut map = ControlMap::default();
        for (gesture, action) in bindings {
            if let Some(name) = gesture.strip_prefix("finger.") {
                let finger = Finger::from_name(name)
                    .ok_or_else(|| anyhow!("unknown finger '{name}' in binding '{gesture}'"))?;
                map.finger_actions.push(FingerBinding {
                    finger,
                    latch: gesture.clone(),
                    action: parse_action(gesture, action)?,
                });
            } else if gesture == "pinch" {
                map.pinch_action = Some(parse_action(gesture, action)?);
            } else if gesture == "cursor" {
                let name = action
                    .strip_prefix("move:")
                    .with_context(|| format!("cursor binding must be 'move:<landmark>', got '{action}'"))?
                    .trim();
                map.cursor_landmark = Some(
                    landmarks::index_of(name)
                        .ok_or_else(|| anyhow!("unknown landmark '{name}' in cursor binding"))?,
                );
            } else if gesture == "scroll" {
                let list = action
                    .strip_prefix("fingers:")
                    .with_context(|| format!("scroll binding must be 'fingers:a+b', got '{action}'"))?;
                for part in list.split('+') {
                    let name = part.trim();
                    let finger = Finger::from_name(name).ok_or_else(|| {
                        anyhow!("unknown finger '{name}' in scroll binding")
                    })?;
                    map.scroll_fingers.push(finger);
                }
            } else {
                bail!("unknown gesture name '{gesture}' in bindings");
            }
        }
        // bindings come from a HashMap; fix the evaluation order
        map.finger_actions.sort_by_key(|b| b.finger as usize);
        Ok(map)
    }

    /// Every latch the debouncer must hold for this map.
    pub fn latch_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.finger_actions.iter().map(|b| b.latch.clone()).collect();
        if self.pinch_action.is_some() {
            keys.push("pinch".to_string());
        }
        keys
    }
}

fn parse_action(gesture: &str, action: &str) -> Result<GestureAction> {
    if let Some(sym) = action.strip_prefix("key:") {
        let sym = sym.trim();
        if sym.is_empty() {
            bail!("binding '{gesture}' has an empty key symbol");
        }
        Ok(GestureAction::Key(sym.to_string()))
    } else if let Some(btn) = action.strip_prefix("mouse:") {
        let button = MouseButton::from_name(btn.trim())
            .with_context(|| format!("binding '{gesture}'"))?;
        Ok(GestureAction::Mouse(button))
    } else {
        bail!("binding '{gesture}' has unsupported action '{action}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_a_full_table() {
        let map = ControlMap::from_bindings(&table(&[
            ("finger.thumb", "key:space"),
            ("finger.pinky", "mouse:right"),
            ("pinch", "mouse:left"),
            ("cursor", "move:index_tip"),
            ("scroll", "fingers:index+middle"),
        ]))
        .unwrap();

        assert_eq!(map.finger_actions.len(), 2);
        assert_eq!(map.finger_actions[0].finger, Finger::Thumb);
        assert_eq!(
            map.finger_actions[0].action,
            GestureAction::Key("space".to_string())
        );
        assert_eq!(map.pinch_action, Some(GestureAction::Mouse(MouseButton::Left)));
        assert_eq!(map.cursor_landmark, Some(landmarks::INDEX_TIP));
        assert_eq!(map.scroll_fingers, vec![Finger::Index, Finger::Middle]);
    }

    #[test]
    fn unknown_gesture_name_fails_loudly() {
        assert!(ControlMap::from_bindings(&table(&[("wave", "key:w")])).is_err());
        assert!(ControlMap::from_bindings(&table(&[("finger.sixth", "key:w")])).is_err());
        assert!(ControlMap::from_bindings(&table(&[("cursor", "move:elbow")])).is_err());
        assert!(ControlMap::from_bindings(&table(&[("scroll", "fingers:index+palm")])).is_err());
    }

    #[test]
    fn unsupported_action_fails_loudly() {
        assert!(ControlMap::from_bindings(&table(&[("pinch", "cmd:rm -rf")])).is_err());
        assert!(ControlMap::from_bindings(&table(&[("finger.thumb", "key:")])).is_err());
        assert!(ControlMap::from_bindings(&table(&[("finger.thumb", "mouse:side")])).is_err());
    }

    #[test]
    fn latch_keys_cover_fingers_and_pinch() {
        let map = ControlMap::from_bindings(&table(&[
            ("finger.thumb", "key:space"),
            ("pinch", "mouse:left"),
        ]))
        .unwrap();
        let keys = map.latch_keys();
        assert!(keys.contains(&"finger.thumb".to_string()));
        assert!(keys.contains(&"pinch".to_string()));
    }
}
