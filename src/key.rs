use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Logical key identity understood by the typing engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Backspace,
    Char(char),
}

impl Key {
    /// Parse a key name: `"Enter"`, `" "`, `"Backspace"` or one printable character.
    pub fn from_name(name: &str) -> Option<Key> {
        match name {
            "Enter" => Some(Key::Enter),
            " " => Some(Key::Space),
            "Backspace" => Some(Key::Backspace),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_control() && !c.is_whitespace() => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Shift only selects the character; any other held modifier makes a chord.
    pub fn is_chord(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(m: KeyModifiers) -> Self {
        Self {
            shift: m.contains(KeyModifiers::SHIFT),
            ctrl: m.contains(KeyModifiers::CONTROL),
            alt: m.contains(KeyModifiers::ALT),
            meta: m.intersects(KeyModifiers::SUPER | KeyModifiers::META | KeyModifiers::HYPER),
        }
    }
}

/// A single key event as delivered to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyStroke {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn char(c: char) -> Self {
        if c == ' ' {
            Self::plain(Key::Space)
        } else {
            Self::plain(Key::Char(c))
        }
    }

    /// Strokes for typing `text` one character at a time.
    pub fn typed(text: &str) -> Vec<KeyStroke> {
        text.chars().map(KeyStroke::char).collect()
    }

    /// Translate a terminal key event. Keys the engine has no use for, and
    /// key releases, map to `None`.
    pub fn from_key_event(event: &KeyEvent) -> Option<KeyStroke> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let key = match event.code {
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Char(' ') => Key::Space,
            KeyCode::Char(c) => Key::Char(c),
            _ => return None,
        };
        Some(KeyStroke::new(key, event.modifiers.into()))
    }
}
