//! Keyboard state tracking with a per-frame latched snapshot.
//!
//! The platform layer feeds raw edges (`key_down` / `key_up`) into
//! [`InputState`] whenever they arrive. Once per frame, before any script
//! runs, the host calls [`InputState::latch`] which produces an immutable
//! [`InputSnapshot`] and clears the transient edge sets.
//!
//! - **Level-triggered (down):** `is_key_down(key)` is true every frame the key
//!   is physically held.
//!
//! - **Edge-triggered (pressed / released):** true only in the snapshot of the
//!   frame the transition happened. A press and release that both land between
//!   two latches show up as pressed *and* released, but not down, so a quick
//!   tap is never lost.
//!
//! Every script in a frame reads the same snapshot through a shared reference,
//! so no script can observe a half-updated input state.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Left,
    Right,
    Up,
    Down,
    Space,
    Escape,
    Enter,
    Tab,
    Backspace,
    LeftShift,
    LeftControl,
    LeftAlt,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl Key {
    /// Every key in declaration order.
    pub const ALL: &'static [Key] = &[
        Key::A,
        Key::B,
        Key::C,
        Key::D,
        Key::E,
        Key::F,
        Key::G,
        Key::H,
        Key::I,
        Key::J,
        Key::K,
        Key::L,
        Key::M,
        Key::N,
        Key::O,
        Key::P,
        Key::Q,
        Key::R,
        Key::S,
        Key::T,
        Key::U,
        Key::V,
        Key::W,
        Key::X,
        Key::Y,
        Key::Z,
        Key::Num0,
        Key::Num1,
        Key::Num2,
        Key::Num3,
        Key::Num4,
        Key::Num5,
        Key::Num6,
        Key::Num7,
        Key::Num8,
        Key::Num9,
        Key::Left,
        Key::Right,
        Key::Up,
        Key::Down,
        Key::Space,
        Key::Escape,
        Key::Enter,
        Key::Tab,
        Key::Backspace,
        Key::LeftShift,
        Key::LeftControl,
        Key::LeftAlt,
        Key::F1,
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F5,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
        Key::F12,
    ];

    /// Stable lowercase name used by scripts and replay files.
    pub fn name(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
            Self::E => "e",
            Self::F => "f",
            Self::G => "g",
            Self::H => "h",
            Self::I => "i",
            Self::J => "j",
            Self::K => "k",
            Self::L => "l",
            Self::M => "m",
            Self::N => "n",
            Self::O => "o",
            Self::P => "p",
            Self::Q => "q",
            Self::R => "r",
            Self::S => "s",
            Self::T => "t",
            Self::U => "u",
            Self::V => "v",
            Self::W => "w",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::Num0 => "0",
            Self::Num1 => "1",
            Self::Num2 => "2",
            Self::Num3 => "3",
            Self::Num4 => "4",
            Self::Num5 => "5",
            Self::Num6 => "6",
            Self::Num7 => "7",
            Self::Num8 => "8",
            Self::Num9 => "9",
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::Space => "space",
            Self::Escape => "escape",
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::LeftShift => "left_shift",
            Self::LeftControl => "left_control",
            Self::LeftAlt => "left_alt",
            Self::F1 => "f1",
            Self::F2 => "f2",
            Self::F3 => "f3",
            Self::F4 => "f4",
            Self::F5 => "f5",
            Self::F6 => "f6",
            Self::F7 => "f7",
            Self::F8 => "f8",
            Self::F9 => "f9",
            Self::F10 => "f10",
            Self::F11 => "f11",
            Self::F12 => "f12",
        }
    }

    /// Case-insensitive lookup by [`Key::name`].
    pub fn from_name(name: &str) -> Option<Key> {
        let lowered = name.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|key| key.name() == lowered)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_name(s).ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Live keyboard state written by the platform layer.
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Freeze the current state into a snapshot for this frame and start
    /// collecting edges for the next one.
    pub fn latch(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            down: self.held.clone(),
            pressed: std::mem::take(&mut self.just_pressed),
            released: std::mem::take(&mut self.just_released),
        };
        if !snapshot.pressed.is_empty() || !snapshot.released.is_empty() {
            log::trace!(
                "Input latched: {} down, {} pressed, {} released",
                snapshot.down.len(),
                snapshot.pressed.len(),
                snapshot.released.len()
            );
        }
        snapshot
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the keyboard for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    down: HashSet<Key>,
    pressed: HashSet<Key>,
    released: HashSet<Key>,
}

impl InputSnapshot {
    /// Snapshot with nothing held and no transitions.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.down.contains(&key)
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: Key) -> bool {
        self.released.contains(&key)
    }

    pub fn down_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.down.iter().copied()
    }
}
