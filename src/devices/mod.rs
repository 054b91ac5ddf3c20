//! Control tables and simulated devices.

pub mod gamepad;
#[cfg(feature = "virtual")]
mod virtual_input;

#[cfg(feature = "virtual")]
pub use virtual_input::{ButtonStub, ValueStub, VirtualGamepad};
