// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input events consumed from the host.
//!
//! Positions are in device space (pixels of the visible surface).

use vpe_graph::Point;

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left button
    Primary,
    /// Right button
    Secondary,
    /// Wheel button
    Middle,
}

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    /// Control
    pub ctrl: bool,
    /// Shift
    pub shift: bool,
    /// Alt / Option
    pub alt: bool,
    /// Command / Super
    pub meta: bool,
}

impl Modifiers {
    /// No modifier held
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };
    /// Control only
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };
    /// Shift only
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };
    /// Alt only
    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };
    /// Control and shift
    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        shift: true,
        ..Self::NONE
    };

    /// Platform command modifier (Ctrl, or Cmd on macOS keyboards)
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer press, move or release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Button involved; ignored for moves
    pub button: MouseButton,
    /// Device position
    pub position: Point,
    /// Held modifiers
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Primary-button event without modifiers
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            button: MouseButton::Primary,
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    /// Same event with other modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Same event with another button
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }
}

/// Wheel rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    /// Vertical delta, positive away from the user
    pub delta_y: f64,
    /// Device position of the pointer
    pub position: Point,
    /// Held modifiers
    pub modifiers: Modifiers,
}

/// Keys the scene reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape
    Escape,
    /// Delete
    Delete,
    /// Backspace
    Backspace,
    /// Arrow up
    ArrowUp,
    /// Arrow down
    ArrowDown,
    /// Arrow left
    ArrowLeft,
    /// Arrow right
    ArrowRight,
    /// A character key, lowercase
    Char(char),
}

/// Key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key
    pub key: Key,
    /// Held modifiers
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Key press with modifiers
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}
