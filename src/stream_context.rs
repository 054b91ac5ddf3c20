//! Binding of a stream to its subscribers.
//!
//! A [`StreamContext`] is what consumers attach to. It exists per usage and may be created
//! before any producer: subscriptions target a usage, and the context is bound to the
//! [`Stream`] once one is created for that usage.
//!
//! During [`StreamContext::process`] each pending value is delivered to every subscriber
//! before the next value is looked at:
//!
//! ```text
//! v1 -> observer 0, observer 1, ..., callbacks
//! v2 -> observer 0, observer 1, ..., callbacks
//! ```

use crate::callback::{Callback, CallbackRegistry};
use crate::error::Result;
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::stream::Stream;
use crate::subscription::Subscription;
use crate::usage::Usage;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Live binding of a [`Stream`] to its observers.
pub struct StreamContext<T> {
    usage: Usage,
    stream: RefCell<Weak<RefCell<Stream<T>>>>,
    observers: ObserverList<T>,
    callbacks: CallbackRegistry<T>,
    // Values delivered by the last process, consumed by the next advance.
    processed: Cell<usize>,
    warn_on_leaks: bool,
}

impl<T: Clone + 'static> StreamContext<T> {
    pub(crate) fn new(usage: Usage, warn_on_leaks: bool) -> Self {
        Self {
            usage,
            stream: RefCell::new(Weak::new()),
            observers: ObserverList::new(),
            callbacks: CallbackRegistry::new(),
            processed: Cell::new(0),
            warn_on_leaks,
        }
    }

    #[inline]
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// True while bound to a live stream.
    pub fn has_stream(&self) -> bool {
        self.stream.borrow().strong_count() > 0
    }

    pub(crate) fn set_stream(&self, stream: Weak<RefCell<Stream<T>>>) {
        *self.stream.borrow_mut() = stream;
    }

    /// Register an observer; disposing the returned subscription removes it again.
    pub fn subscribe(&self, observer: Rc<dyn Observer<T>>) -> Subscription {
        self.observers.add(observer)
    }

    /// Register a raw callback. Callbacks run after the managed observers, for every value.
    ///
    /// # Errors
    /// [`Error::InvalidCallback`](crate::Error::InvalidCallback) if the callback has no
    /// function.
    pub fn subscribe_callback(&self, callback: Callback<T>) -> Result<Subscription> {
        self.callbacks.add(callback.clone())?;
        let callbacks = self.callbacks.clone();
        Ok(Subscription::new(move || {
            callbacks.remove(&callback);
            Ok(())
        }))
    }

    /// Number of registered observers, callbacks excluded.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Deliver the pending values of the bound stream, oldest first.
    ///
    /// The number of values delivered is fixed when processing starts. Values offered while
    /// processing (by observers, timers or deferred actions) stay pending and are delivered by
    /// the next process.
    pub fn process(&self) {
        let Some(stream) = self.stream.borrow().upgrade() else {
            return;
        };
        let count = stream.borrow().len();
        for index in 0..count {
            let value = stream.borrow().as_slice().get(index).cloned();
            let Some(value) = value else {
                break;
            };
            #[cfg(feature = "debug-log")]
            log::trace!("stream {} value {} of {}", self.usage, index + 1, count);
            self.observers.on_next(&value);
            self.callbacks.invoke(&value);
            self.processed.set(index + 1);
        }
    }

    /// End the frame for the bound stream: the last delivered value becomes the previous
    /// value, values not delivered yet stay pending.
    pub fn advance(&self) {
        let consumed = self.processed.replace(0);
        if let Some(stream) = self.stream.borrow().upgrade() {
            stream.borrow_mut().advance_by(consumed);
        }
    }

    /// Detach from the stream and drop raw callbacks. Observers still registered are reported
    /// as leaks.
    pub fn dispose(&self) {
        if self.warn_on_leaks {
            for id in self.observers.ids() {
                log::warn!(
                    "observer {id} still subscribed to stream {} at disposal; dispose subscriptions before their context",
                    self.usage
                );
            }
        }
        self.callbacks.clear();
        *self.stream.borrow_mut() = Weak::new();
    }
}

impl<T> fmt::Debug for StreamContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamContext")
            .field("usage", &self.usage)
            .field("observers", &self.observers.len())
            .field("callbacks", &self.callbacks.len())
            .field("bound", &(self.stream.borrow().strong_count() > 0))
            .finish()
    }
}

/// Type-erased view used by the owning context to drive updates.
pub(crate) trait AnyStreamContext {
    fn process(&self);
    fn advance(&self);
    fn dispose(&self);
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Clone + 'static> AnyStreamContext for StreamContext<T> {
    fn process(&self) {
        StreamContext::process(self)
    }

    fn advance(&self) {
        StreamContext::advance(self)
    }

    fn dispose(&self) {
        StreamContext::dispose(self)
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
