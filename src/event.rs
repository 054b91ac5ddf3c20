//! Discrete input events.
//!
//! Continuous controls flow through the pipeline as their raw values (`bool`, `f32`,
//! [`Vec2`](crate::devices::gamepad::Vec2), ...). Edge nodes such as
//! [`pressed`](crate::InputSourceExt::pressed) turn them into [`InputEvent`]s: small,
//! timestamped facts about *when* something happened.
//!
//! ## Conventions
//! - **Buttons:** `true` is down. Edges are computed against the last value the node saw,
//!   so a press followed by a release within one frame still yields a press event.
//! - **Timestamps:** read from the clock of the context the node is connected to when the
//!   event is emitted. For [`EdgeKind::Held`] this is the expiry time of the hold.

use crate::time::TimePoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// A button went from up to down.
    Pressed,

    /// A button went from down to up.
    Released,

    /// A button stayed down for the configured duration.
    Held,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::Pressed => "pressed",
            EdgeKind::Released => "released",
            EdgeKind::Held => "held",
        };
        f.write_str(name)
    }
}

/// Timestamped edge emitted by the edge nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputEvent {
    /// Time of the edge, in the connected context's clock.
    pub at: TimePoint,
    /// The edge itself.
    pub kind: EdgeKind,
}

impl InputEvent {
    #[inline]
    pub fn new(kind: EdgeKind, at: TimePoint) -> Self {
        Self { at, kind }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.kind, self.at)
    }
}
