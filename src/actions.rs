use anyhow::{Result, anyhow};
use log::{info, warn};

use crate::engine::{Command, MouseButton};

/// Virtual input device. On non-Linux targets it degrades to a NO-OP
/// sink so the rest of the daemon keeps running.
pub struct UinputSink {
    #[allow(dead_code)]
    linux: Option<Box<LinuxUinput>>,
}

impl UinputSink {
    pub fn new(screen_w: u32, screen_h: u32) -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            let dev = LinuxUinput::create(screen_w as i32, screen_h as i32)?;
            return Ok(Self {
                linux: Some(Box::new(dev)),
            });
        }
        #[allow(unreachable_code)]
        {
            let _ = (screen_w, screen_h);
            warn!("uinput not available; running in NO-OP mode");
            Ok(Self { linux: None })
        }
    }

    /// Apply one engine command.
    pub fn apply(&mut self, cmd: &Command) -> Result<()> {
        match cmd {
            Command::KeyDown(sym) => self.key(sym, true),
            Command::KeyUp(sym) => self.key(sym, false),
            Command::MoveTo { x, y } => self.move_to(*x, *y),
            Command::MouseButton { button, down } => self.button(*button, *down),
            Command::Scroll { amount, horizontal } => self.scroll(*amount, *horizontal),
        }
    }

    pub fn key(&mut self, sym: &str, down: bool) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            let key = map_key(&sym.trim().to_ascii_uppercase())?;
            dev.key_send(key, if down { 1 } else { 0 })?;
            dev.sync()?;
        }
        Ok(())
    }

    pub fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.move_to(x, y)?;
        }
        Ok(())
    }

    pub fn button(&mut self, button: MouseButton, down: bool) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.button(button, down)?;
        }
        Ok(())
    }

    pub fn scroll(&mut self, steps: i32, horizontal: bool) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.scroll(steps, horizontal)?;
        }
        Ok(())
    }

    pub fn click_mouse(&mut self, which: &str) -> Result<()> {
        let button = MouseButton::from_name(which)?;
        self.button(button, true)?;
        self.button(button, false)
    }

    /// Send a chord like "CTRL+EQUAL" or single "TAB".
    pub fn key_chord(&mut self, chord: &str) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            let parts: Vec<_> = chord
                .split('+')
                .map(|s| s.trim().to_ascii_uppercase())
                .collect();
            let mut keys = Vec::with_capacity(parts.len());
            for p in parts {
                keys.push(map_key(&p)?);
            }
            // press in order
            for k in &keys {
                dev.key_send(*k, 1)?;
            }
            dev.sync()?;
            // release in reverse
            for k in keys.iter().rev() {
                dev.key_send(*k, 0)?;
            }
            dev.sync()?;
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn map_key(tok: &str) -> Result<uinput::event::keyboard::Key> {
    use uinput::event::keyboard::Key as K;
    let k = match tok {
        "CTRL" | "CONTROL" => K::LeftControl,
        "ALT" => K::LeftAlt,
        "SHIFT" => K::LeftShift,
        "SUPER" | "META" | "WIN" => K::LeftMeta,
        "TAB" => K::Tab,
        "SPACE" => K::Space,
        "ENTER" | "RETURN" => K::Enter,
        "ESC" | "ESCAPE" => K::Esc,
        "BACKSPACE" => K::BackSpace,
        "DELETE" => K::Delete,
        "HOME" => K::Home,
        "END" => K::End,
        "PAGEUP" => K::PageUp,
        "PAGEDOWN" => K::PageDown,
        "UP" => K::Up,
        "DOWN" => K::Down,
        "LEFT" => K::Left,
        "RIGHT" => K::Right,
        "MINUS" | "-" => K::Minus,
        "EQUAL" | "=" => K::Equal,
        "COMMA" | "," => K::Comma,
        "DOT" | "." => K::Dot,
        "SLASH" | "/" => K::Slash,
        "A" => K::A,
        "B" => K::B,
        "C" => K::C,
        "D" => K::D,
        "E" => K::E,
        "F" => K::F,
        "G" => K::G,
        "H" => K::H,
        "I" => K::I,
        "J" => K::J,
        "K" => K::K,
        "L" => K::L,
        "M" => K::M,
        "N" => K::N,
        "O" => K::O,
        "P" => K::P,
        "Q" => K::Q,
        "R" => K::R,
        "S" => K::S,
        "T" => K::T,
        "U" => K::U,
        "V" => K::V,
        "W" => K::W,
        "X" => K::X,
        "Y" => K::Y,
        "Z" => K::Z,
        "1" => K::_1,
        "2" => K::_2,
        "3" => K::_3,
        "4" => K::_4,
        "5" => K::_5,
        "6" => K::_6,
        "7" => K::_7,
        "8" => K::_8,
        "9" => K::_9,
        "0" => K::_0,
        other => return Err(anyhow!("unsupported key token: {other}")),
    };
    Ok(k)
}

#[cfg(target_os = "linux")]
struct LinuxUinput {
    dev: uinput::device::Device,
}

#[cfg(target_os = "linux")]
impl LinuxUinput {
    fn create(screen_w: i32, screen_h: i32) -> Result<Self> {
        use uinput::event::{Keyboard, absolute, controller::Mouse, relative};

        let dev = uinput::default()?
            .name("Handctl Virtual Input")?
            // absolute pointer placement, sized to the configured screen
            .event(absolute::Position::X)?
            .min(0)
            .max(screen_w)
            .event(absolute::Position::Y)?
            .min(0)
            .max(screen_h)
            // wheels
            .event(relative::Wheel::Vertical)?
            .event(relative::Wheel::Horizontal)?
            // mouse buttons
            .event(Mouse::Left)?
            .event(Mouse::Right)?
            .event(Mouse::Middle)?
            // symbolic keys are caller-defined; register the lot
            .event(Keyboard::All)?
            .create()?;

        info!("uinput: created virtual device ({screen_w}x{screen_h})");
        Ok(Self { dev })
    }

    fn sync(&mut self) -> Result<()> {
        self.dev.synchronize()?;
        Ok(())
    }

    fn key_send(&mut self, key: uinput::event::keyboard::Key, val: i32) -> Result<()> {
        self.dev.send(key, val)?;
        Ok(())
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        use uinput::event::absolute::Position;
        self.dev.send(Position::X, x)?;
        self.dev.send(Position::Y, y)?;
        self.sync()
    }

    fn button(&mut self, button: MouseButton, down: bool) -> Result<()> {
        use uinput::event::controller::Mouse;
        let ev = match button {
            MouseButton::Left => Mouse::Left,
            MouseButton::Right => Mouse::Right,
            MouseButton::Middle => Mouse::Middle,
        };
        self.dev.send(ev, if down { 1 } else { 0 })?;
        self.sync()
    }

    fn scroll(&mut self, steps: i32, horizontal: bool) -> Result<()> {
        use uinput::event::relative::Wheel;
        if horizontal {
            self.dev.send(Wheel::Horizontal, steps)?;
        } else {
            self.dev.send(Wheel::Vertical, steps)?;
        }
        self.sync()
    }
}
