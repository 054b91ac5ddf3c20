//! Gamepad control table.
//!
//! All controls live on the HID Generic Desktop / Game Controls usage page (`0x05`).
//!
//! | Control          | Type   | Usage       |
//! |------------------|--------|-------------|
//! | face buttons     | `bool` | `0005:0090`–`0005:0093` |
//! | shoulders        | `bool` | `0005:0094`–`0005:0095` |
//! | select / start   | `bool` | `0005:0096`–`0005:0097` |
//! | d-pad            | `bool` | `0005:0098`–`0005:009b` |
//! | sticks           | [`Vec2`] | `0005:00a0`–`0005:00a1` |
//! | triggers         | `f32`  | `0005:00c4`–`0005:00c5` |
//!
//! Stick axes are normalized to `[-1.0, 1.0]`, triggers to `[0.0, 1.0]`.

use crate::source::Control;
use crate::usage::Usage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gamepad usage page.
pub const PAGE: u16 = 0x05;

const fn usage(id: u16) -> Usage {
    Usage::from_parts(PAGE, id)
}

/// Two-axis stick position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

pub const BUTTON_SOUTH: Control<bool> = Control::new(usage(0x90), "Gamepad.ButtonSouth");
pub const BUTTON_EAST: Control<bool> = Control::new(usage(0x91), "Gamepad.ButtonEast");
pub const BUTTON_WEST: Control<bool> = Control::new(usage(0x92), "Gamepad.ButtonWest");
pub const BUTTON_NORTH: Control<bool> = Control::new(usage(0x93), "Gamepad.ButtonNorth");
pub const LEFT_SHOULDER: Control<bool> = Control::new(usage(0x94), "Gamepad.LeftShoulder");
pub const RIGHT_SHOULDER: Control<bool> = Control::new(usage(0x95), "Gamepad.RightShoulder");
pub const SELECT: Control<bool> = Control::new(usage(0x96), "Gamepad.Select");
pub const START: Control<bool> = Control::new(usage(0x97), "Gamepad.Start");
pub const DPAD_UP: Control<bool> = Control::new(usage(0x98), "Gamepad.Up");
pub const DPAD_DOWN: Control<bool> = Control::new(usage(0x99), "Gamepad.Down");
pub const DPAD_LEFT: Control<bool> = Control::new(usage(0x9A), "Gamepad.Left");
pub const DPAD_RIGHT: Control<bool> = Control::new(usage(0x9B), "Gamepad.Right");

pub const LEFT_STICK: Control<Vec2> = Control::new(usage(0xA0), "Gamepad.LeftStick");
pub const RIGHT_STICK: Control<Vec2> = Control::new(usage(0xA1), "Gamepad.RightStick");

pub const LEFT_TRIGGER: Control<f32> = Control::new(usage(0xC4), "Gamepad.LeftTrigger");
pub const RIGHT_TRIGGER: Control<f32> = Control::new(usage(0xC5), "Gamepad.RightTrigger");

/// Every button, in declaration order.
pub const BUTTONS: [Control<bool>; 12] = [
    BUTTON_SOUTH,
    BUTTON_EAST,
    BUTTON_WEST,
    BUTTON_NORTH,
    LEFT_SHOULDER,
    RIGHT_SHOULDER,
    SELECT,
    START,
    DPAD_UP,
    DPAD_DOWN,
    DPAD_LEFT,
    DPAD_RIGHT,
];

pub const STICKS: [Control<Vec2>; 2] = [LEFT_STICK, RIGHT_STICK];

pub const TRIGGERS: [Control<f32>; 2] = [LEFT_TRIGGER, RIGHT_TRIGGER];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn usages_are_unique_and_on_the_gamepad_page() {
        let usages: Vec<Usage> = BUTTONS
            .iter()
            .map(|c| c.usage())
            .chain(STICKS.iter().map(|c| c.usage()))
            .chain(TRIGGERS.iter().map(|c| c.usage()))
            .collect();
        let unique: HashSet<_> = usages.iter().copied().collect();
        assert_eq!(unique.len(), usages.len());
        assert!(usages.iter().all(|u| u.page() == PAGE && u.is_valid()));
    }

    #[test]
    fn vec2_length() {
        assert!((Vec2::new(3.0, 4.0).length() - 5.0).abs() < 1e-6);
        assert_eq!(Vec2::ZERO.to_string(), "(0.000, 0.000)");
    }
}
