//! Observer contract.
//!
//! Everything that receives values from the pipeline implements [`Observer`]. Observers are
//! shared (`Rc<dyn Observer<T>>`) and may be re-entered while they run, so the methods take
//! `&self`; implementations keep their state in `Cell`/`RefCell`.

use crate::error::Error;
use std::cell::{Cell, RefCell};
use std::fmt;

/// One message delivered to an observer.
///
/// This is the closed set of things a producer can say: a value, "no more values", or an
/// error. [`Observer::notify`] dispatches it to the matching method.
#[derive(Debug)]
pub enum Notification<'a, T> {
    Next(&'a T),
    Completed,
    Error(&'a Error),
}

impl<T> Clone for Notification<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Notification<'_, T> {}

/// Receives values from a producer.
pub trait Observer<T> {
    /// A new value.
    fn on_next(&self, value: &T);

    /// The producer will not emit again.
    fn on_completed(&self) {}

    /// The producer failed. The default only logs: most nodes forward errors rather than
    /// recover from them.
    fn on_error(&self, error: &Error) {
        log::warn!("unhandled pipeline error: {error}");
    }

    /// Dispatch a [`Notification`] to the matching method.
    fn notify(&self, notification: Notification<'_, T>) {
        match notification {
            Notification::Next(value) => self.on_next(value),
            Notification::Completed => self.on_completed(),
            Notification::Error(error) => self.on_error(error),
        }
    }
}

/// Adapts a closure into an [`Observer`] that only cares about values.
pub struct FnObserver<F>(F);

impl<F> FnObserver<F> {
    pub fn new(f: F) -> Self {
        FnObserver(f)
    }
}

impl<T, F: Fn(&T)> Observer<T> for FnObserver<F> {
    fn on_next(&self, value: &T) {
        (self.0)(value)
    }
}

/// Records everything it observes.
///
/// Handy for tests and demos:
/// ```
/// use std::rc::Rc;
/// use stickflow::{ListObserver, Observer};
///
/// let observer = Rc::new(ListObserver::new());
/// observer.on_next(&1);
/// observer.on_next(&2);
/// assert_eq!(observer.values(), vec![1, 2]);
/// ```
pub struct ListObserver<T> {
    next: RefCell<Vec<T>>,
    completed: Cell<usize>,
    errors: RefCell<Vec<String>>,
}

impl<T> Default for ListObserver<T> {
    fn default() -> Self {
        Self {
            next: RefCell::new(Vec::new()),
            completed: Cell::new(0),
            errors: RefCell::new(Vec::new()),
        }
    }
}

impl<T> ListObserver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values received so far.
    pub fn len(&self) -> usize {
        self.next.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.borrow().is_empty()
    }

    /// Copy of the received values.
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.next.borrow().clone()
    }

    /// Drain the received values.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.next.borrow_mut())
    }

    /// How many times `on_completed` was called.
    pub fn completed(&self) -> usize {
        self.completed.get()
    }

    /// Rendered messages of the errors received.
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl<T: Clone> Observer<T> for ListObserver<T> {
    fn on_next(&self, value: &T) {
        self.next.borrow_mut().push(value.clone());
    }

    fn on_completed(&self) {
        self.completed.set(self.completed.get() + 1);
    }

    fn on_error(&self, error: &Error) {
        self.errors.borrow_mut().push(error.to_string());
    }
}

impl<T: fmt::Debug> fmt::Debug for ListObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListObserver")
            .field("next", &self.next.borrow())
            .field("completed", &self.completed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_dispatches_to_matching_method() {
        let observer = ListObserver::new();
        observer.notify(Notification::Next(&7));
        observer.notify(Notification::Completed);
        observer.notify(Notification::Error(&Error::ObserverListEmpty));

        assert_eq!(observer.values(), vec![7]);
        assert_eq!(observer.completed(), 1);
        assert_eq!(observer.errors().len(), 1);
    }

    #[test]
    fn fn_observer_forwards_values() {
        let seen = Cell::new(0);
        let observer = FnObserver::new(|v: &i32| seen.set(seen.get() + *v));
        observer.on_next(&2);
        observer.on_next(&3);
        assert_eq!(seen.get(), 5);
    }
}
