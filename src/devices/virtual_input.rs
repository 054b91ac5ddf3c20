use super::gamepad::{self, Vec2};
use crate::context::Context;
use crate::error::Result;
use crate::source::Control;
use crate::stream::StreamWriter;
use crate::usage::{Endpoint, Usage};
use indexmap::IndexMap;
use std::fmt;

/// Producer side of a simulated button.
#[derive(Clone)]
pub struct ButtonStub {
    writer: StreamWriter<bool>,
}

impl ButtonStub {
    pub fn press(&self) {
        self.writer.offer(true);
    }

    pub fn release(&self) {
        self.writer.offer(false);
    }

    pub fn set(&self, down: bool) {
        self.writer.offer(down);
    }

    pub fn usage(&self) -> Usage {
        self.writer.usage()
    }
}

impl fmt::Debug for ButtonStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonStub")
            .field("usage", &self.writer.usage())
            .finish()
    }
}

/// Producer side of a simulated continuous control.
pub struct ValueStub<T> {
    writer: StreamWriter<T>,
}

impl<T> Clone for ValueStub<T> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<T> ValueStub<T> {
    pub fn change(&self, value: T) {
        self.writer.offer(value);
    }

    pub fn usage(&self) -> Usage {
        self.writer.usage()
    }
}

impl<T> fmt::Debug for ValueStub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStub")
            .field("usage", &self.writer.usage())
            .finish()
    }
}

// Reuses the stream if the control is already produced in this context.
fn writer_for<T: Clone + 'static>(
    control: Control<T>,
    context: &Context,
    initial_value: T,
) -> Result<StreamWriter<T>> {
    match context.stream::<T>(control.usage()) {
        Some(writer) => Ok(writer),
        None => control.create_stream(context, initial_value),
    }
}

impl Control<bool> {
    /// Simulate this button in `context`. The button starts released.
    pub fn stub(&self, context: &Context) -> Result<ButtonStub> {
        Ok(ButtonStub {
            writer: writer_for(*self, context, false)?,
        })
    }
}

impl<T: Clone + Default + 'static> Control<T> {
    /// Simulate this control in `context`, starting at `T::default()`.
    pub fn value_stub(&self, context: &Context) -> Result<ValueStub<T>> {
        Ok(ValueStub {
            writer: writer_for(*self, context, T::default())?,
        })
    }
}

/// A software gamepad that feeds every control of the [`gamepad`] table into a context.
pub struct VirtualGamepad {
    id: u16,
    name: String,
    buttons: IndexMap<Usage, ButtonStub>,
    triggers: IndexMap<Usage, ValueStub<f32>>,
    sticks: IndexMap<Usage, ValueStub<Vec2>>,
}

impl VirtualGamepad {
    /// Attach a gamepad to `context`. `id` becomes the source id of its endpoints; with id 0
    /// they are wildcards.
    pub fn attach(context: &Context, id: u16, name: &str) -> Result<Self> {
        let buttons: IndexMap<_, _> = gamepad::BUTTONS
            .iter()
            .map(|control| Ok((control.usage(), control.stub(context)?)))
            .collect::<Result<_>>()?;
        let triggers: IndexMap<_, _> = gamepad::TRIGGERS
            .iter()
            .map(|control| Ok((control.usage(), control.value_stub(context)?)))
            .collect::<Result<_>>()?;
        let sticks: IndexMap<_, _> = gamepad::STICKS
            .iter()
            .map(|control| Ok((control.usage(), control.value_stub(context)?)))
            .collect::<Result<_>>()?;
        log::debug!("virtual gamepad {id} ({name}) attached to context {}", context.id());
        Ok(Self {
            id,
            name: name.to_string(),
            buttons,
            triggers,
            sticks,
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device-qualified endpoint of one of this gamepad's controls.
    pub fn endpoint<T>(&self, control: Control<T>) -> Endpoint {
        Endpoint::from_device_and_usage(self.id, control.usage())
    }

    /// Returns false if `button` is not a gamepad button.
    pub fn press_button(&self, button: Control<bool>) -> bool {
        self.set_button(button, true)
    }

    pub fn release_button(&self, button: Control<bool>) -> bool {
        self.set_button(button, false)
    }

    pub fn set_button(&self, button: Control<bool>, down: bool) -> bool {
        match self.buttons.get(&button.usage()) {
            Some(stub) => {
                stub.set(down);
                true
            }
            None => false,
        }
    }

    /// Set a trigger. Returns false if `axis` is not a gamepad trigger.
    pub fn set_axis(&self, axis: Control<f32>, value: f32) -> bool {
        match self.triggers.get(&axis.usage()) {
            Some(stub) => {
                stub.change(value);
                true
            }
            None => false,
        }
    }

    /// Set a stick. Returns false if `stick` is not a gamepad stick.
    pub fn set_stick(&self, stick: Control<Vec2>, value: Vec2) -> bool {
        match self.sticks.get(&stick.usage()) {
            Some(stub) => {
                stub.change(value);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for VirtualGamepad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualGamepad")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
