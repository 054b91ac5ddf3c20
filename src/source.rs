//! The subscribe contract.
//!
//! Anything that produces values for a context implements [`InputSource`]: typed controls,
//! stream writers, stream contexts and every combinator node. Sources are descriptions, not
//! live connections; subscribing is what attaches them to a [`Context`].

use crate::context::Context;
use crate::error::Result;
use crate::observer::Observer;
use crate::stream::StreamWriter;
use crate::stream_context::StreamContext;
use crate::subscription::Subscription;
use crate::usage::{Endpoint, Usage};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A producer of `T` values that observers can subscribe to.
pub trait InputSource<T> {
    /// Attach `observer` to this source within `context`.
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription>;
}

impl<T> InputSource<T> for Rc<dyn InputSource<T>> {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription> {
        (**self).subscribe(context, observer)
    }
}

/// A usage with a value type: the typed name of one control.
///
/// ```
/// use stickflow::{Control, Usage};
///
/// const TRIGGER: Control<f32> = Control::new(Usage::from_parts(0x05, 0xC4), "trigger");
/// assert_eq!(TRIGGER.usage().id(), 0xC4);
/// ```
pub struct Control<T> {
    usage: Usage,
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> Control<T> {
    pub const fn new(usage: Usage, name: &'static str) -> Self {
        Self {
            usage,
            name,
            _value: PhantomData,
        }
    }

    #[inline]
    pub const fn usage(&self) -> Usage {
        self.usage
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Wildcard endpoint: this control on any device.
    #[inline]
    pub const fn endpoint(&self) -> Endpoint {
        Endpoint::from_usage(self.usage)
    }
}

impl<T: Clone + 'static> Control<T> {
    /// Register the producer stream for this control.
    pub fn create_stream(&self, context: &Context, initial_value: T) -> Result<StreamWriter<T>> {
        context.create_stream(self.usage, initial_value)
    }

    /// The stream context consumers of this control attach to.
    pub fn stream_context(&self, context: &Context) -> Result<Rc<StreamContext<T>>> {
        context.get_or_create_stream_context(self.usage)
    }
}

impl<T> Clone for Control<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Control<T> {}

impl<T> PartialEq for Control<T> {
    fn eq(&self, other: &Self) -> bool {
        self.usage == other.usage
    }
}

impl<T> Eq for Control<T> {}

impl<T> fmt::Debug for Control<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish()
    }
}

impl<T> fmt::Display for Control<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.usage)
    }
}

impl<T: Clone + 'static> InputSource<T> for Control<T> {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription> {
        Ok(self.stream_context(context)?.subscribe(observer))
    }
}

impl<T: Clone + 'static> InputSource<T> for StreamWriter<T> {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription> {
        Ok(context
            .get_or_create_stream_context::<T>(self.usage())?
            .subscribe(observer))
    }
}

impl<T: Clone + 'static> InputSource<T> for StreamContext<T> {
    fn subscribe(&self, _context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription> {
        Ok(StreamContext::subscribe(self, observer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::observer::ListObserver;

    const BUTTON: Control<bool> = Control::new(Usage::from_parts(0x09, 0x01), "button 1");

    #[test]
    fn control_subscribes_through_its_stream_context() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = BUTTON.subscribe(&context, observer.clone()).unwrap();

        let writer = BUTTON.create_stream(&context, false).unwrap();
        writer.offer(true);
        context.update();
        assert_eq!(observer.values(), vec![true]);
        assert_eq!(BUTTON.stream_context(&context).unwrap().observer_count(), 1);
    }

    #[test]
    fn erased_sources_delegate() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let source: Rc<dyn InputSource<bool>> = Rc::new(writer.clone());
        let observer = Rc::new(ListObserver::new());
        let _sub = source.subscribe(&context, observer.clone()).unwrap();

        writer.offer(true);
        context.update();
        assert_eq!(observer.values(), vec![true]);
    }

    #[test]
    fn display_names_the_control() {
        assert_eq!(BUTTON.to_string(), "button 1 (0009:0001)");
    }
}
