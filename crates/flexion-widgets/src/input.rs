//! Typed input events fed to widgets by a host.
//!
//! A host translates its native pointer and keyboard events into these types
//! and hands them to the widget emitters (see [`crate::widget::pointer_down`]
//! and friends). Reactions get a [`Payload`] and can turn it back into the
//! typed event with `from_payload`.
//!
//! Payload layout:
//!
//! | Key         | Value                                        |
//! |-------------|----------------------------------------------|
//! | `pos`       | `(x, y)` relative to the widget              |
//! | `page_pos`  | `(x, y)` relative to the page                |
//! | `button`    | button code, `0` when no button changed      |
//! | `buttons`   | codes of all pressed buttons                 |
//! | `modifiers` | names of held modifiers (`"Alt"`, `"Shift"`, `"Ctrl"`, `"Meta"`) |
//! | `hscroll`   | horizontal scroll amount (wheel only)        |
//! | `vscroll`   | vertical scroll amount (wheel only)          |
//! | `key`       | key name (keyboard only)                     |

use flexion_core::{Payload, Value};

use crate::float_pair;

/// Keyboard modifiers held during an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyboardModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held.
    pub control: bool,
    /// The Alt key is held.
    pub alt: bool,
    /// The Meta key is held.
    pub meta: bool,
}

impl KeyboardModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Shift modifier only.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Control modifier only.
    pub const CTRL: Self = Self {
        control: true,
        ..Self::NONE
    };

    /// Check if any modifier is pressed.
    pub fn any(&self) -> bool {
        self.shift || self.control || self.alt || self.meta
    }

    fn to_value(self) -> Value {
        let names = [
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.control, "Ctrl"),
            (self.meta, "Meta"),
        ];
        Value::tuple(names.into_iter().filter(|(held, _)| *held).map(|(_, n)| n))
    }

    fn from_value(value: &Value) -> Self {
        let mut modifiers = Self::NONE;
        for name in value.items().unwrap_or_default() {
            match name.as_str() {
                Some("Alt") => modifiers.alt = true,
                Some("Shift") => modifiers.shift = true,
                Some("Ctrl") => modifiers.control = true,
                Some("Meta") => modifiers.meta = true,
                _ => {}
            }
        }
        modifiers
    }
}

/// Mouse buttons, numbered from 1 in payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    /// Primary button (usually left).
    Left = 1,
    /// Secondary button (usually right).
    Right = 2,
    /// Middle button.
    Middle = 3,
    /// Additional button 1.
    Button4 = 4,
    /// Additional button 2.
    Button5 = 5,
}

impl MouseButton {
    /// The payload code of this button.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// The button for a payload code, if any.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            3 => Some(Self::Middle),
            4 => Some(Self::Button4),
            5 => Some(Self::Button5),
            _ => None,
        }
    }
}

/// A pointer press, release or move.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointerEvent {
    /// Position relative to the widget.
    pub pos: (f64, f64),
    /// Position relative to the page.
    pub page_pos: (f64, f64),
    /// The button that changed, if any.
    pub button: Option<MouseButton>,
    /// All buttons held.
    pub buttons: Vec<MouseButton>,
    /// Modifiers held.
    pub modifiers: KeyboardModifiers,
}

impl PointerEvent {
    /// Create an event at a widget-relative position.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            pos: (x, y),
            page_pos: (x, y),
            ..Self::default()
        }
    }

    /// Set the button that changed.
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        if !self.buttons.contains(&button) {
            self.buttons.push(button);
        }
        self
    }

    /// Set the held modifiers.
    pub fn with_modifiers(mut self, modifiers: KeyboardModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Encode as an emitter payload.
    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("pos".into(), float_pair::value(self.pos.0, self.pos.1));
        payload.insert(
            "page_pos".into(),
            float_pair::value(self.page_pos.0, self.page_pos.1),
        );
        payload.insert(
            "button".into(),
            Value::Int(self.button.map_or(0, MouseButton::code)),
        );
        payload.insert(
            "buttons".into(),
            Value::tuple(self.buttons.iter().map(|b| b.code())),
        );
        payload.insert("modifiers".into(), self.modifiers.to_value());
        payload
    }

    /// Decode from an emitter payload.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        Some(Self {
            pos: float_pair::get(payload.get("pos")?)?,
            page_pos: float_pair::get(payload.get("page_pos")?)?,
            button: payload
                .get("button")
                .and_then(Value::as_int)
                .and_then(MouseButton::from_code),
            buttons: payload
                .get("buttons")
                .and_then(Value::items)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_int)
                .filter_map(MouseButton::from_code)
                .collect(),
            modifiers: payload
                .get("modifiers")
                .map(KeyboardModifiers::from_value)
                .unwrap_or_default(),
        })
    }
}

/// A wheel scroll over a widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WheelEvent {
    /// Where the pointer was.
    pub pointer: PointerEvent,
    /// Horizontal scroll amount.
    pub hscroll: f64,
    /// Vertical scroll amount.
    pub vscroll: f64,
}

impl WheelEvent {
    /// Encode as an emitter payload.
    pub fn into_payload(self) -> Payload {
        let mut payload = self.pointer.into_payload();
        payload.insert("hscroll".into(), Value::Float(self.hscroll));
        payload.insert("vscroll".into(), Value::Float(self.vscroll));
        payload
    }

    /// Decode from an emitter payload.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        Some(Self {
            pointer: PointerEvent::from_payload(payload)?,
            hscroll: payload.get("hscroll")?.as_float()?,
            vscroll: payload.get("vscroll")?.as_float()?,
        })
    }
}

/// A key press or release.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    /// Key name, e.g. `"a"` or `"Enter"`.
    pub key: String,
    /// Modifiers held.
    pub modifiers: KeyboardModifiers,
}

impl KeyEvent {
    /// Create an event for a key with no modifiers.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: KeyboardModifiers::NONE,
        }
    }

    /// Set the held modifiers.
    pub fn with_modifiers(mut self, modifiers: KeyboardModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Encode as an emitter payload.
    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("key".into(), Value::Str(self.key));
        payload.insert("modifiers".into(), self.modifiers.to_value());
        payload
    }

    /// Decode from an emitter payload.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        Some(Self {
            key: payload.get("key")?.as_str()?.to_owned(),
            modifiers: payload
                .get("modifiers")
                .map(KeyboardModifiers::from_value)
                .unwrap_or_default(),
        })
    }
}
