//! Reentrant multicast callback registry.
//!
//! A [`CallbackRegistry`] stores `(function, state)` pairs and invokes them in registration
//! order. It is the low-level dispatch primitive behind raw stream subscriptions: functions
//! are plain `fn` pointers and the state is an opaque shared handle, so registering a
//! callback never captures an environment.
//!
//! # Contract
//! - The same pair may be registered several times; it runs once per registration.
//! - [`CallbackRegistry::invoke`] snapshots the entry count when it starts and only
//!   dispatches that many entries. Entries added by a callback run on the *next* invoke.
//! - Entries removed by a callback take effect immediately for entries not reached yet.
//! - Removing a pair that is not registered, or removing from an empty registry, is a no-op.
//!
//! Removal picks the first matching registration. During an invoke, registrations the
//! dispatch has not reached yet are searched first, so a callback that removes itself stops
//! its own duplicates from running again in the same invoke.

use crate::error::{Error, Result};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Signature of a registered function: the dispatched argument plus the registration state.
pub type CallbackFn<A, S> = fn(&A, &S);

/// One `(function, state)` registration.
///
/// Two callbacks are equal when they point at the same function and the same state
/// allocation.
pub struct Callback<A, S: ?Sized = dyn Any> {
    func: Option<CallbackFn<A, S>>,
    state: Rc<S>,
}

impl<A, S: ?Sized> Callback<A, S> {
    pub fn new(func: CallbackFn<A, S>, state: Rc<S>) -> Self {
        Self {
            func: Some(func),
            state,
        }
    }

    /// Build a callback from a possibly missing function, e.g. one received through a
    /// foreign interface. A callback without a function is rejected by
    /// [`CallbackRegistry::add`].
    pub fn from_parts(func: Option<CallbackFn<A, S>>, state: Rc<S>) -> Self {
        Self { func, state }
    }

    #[inline]
    pub fn state(&self) -> &Rc<S> {
        &self.state
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.func.is_some()
    }

    #[inline]
    fn call(&self, arg: &A) {
        if let Some(func) = self.func {
            func(arg, &self.state);
        }
    }
}

impl<A, S: ?Sized> Clone for Callback<A, S> {
    fn clone(&self) -> Self {
        Self {
            func: self.func,
            state: Rc::clone(&self.state),
        }
    }
}

impl<A, S: ?Sized> PartialEq for Callback<A, S> {
    fn eq(&self, other: &Self) -> bool {
        self.func.map(|f| f as usize) == other.func.map(|f| f as usize)
            && Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<A, S: ?Sized> Eq for Callback<A, S> {}

impl<A, S: ?Sized> fmt::Debug for Callback<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("func", &self.func.map(|f| f as usize as *const ()))
            .field("state", &Rc::as_ptr(&self.state).cast::<()>())
            .finish()
    }
}

struct Registry<A, S: ?Sized> {
    entries: RefCell<Vec<Option<Callback<A, S>>>>,
    live: Cell<usize>,
    tombstones: Cell<usize>,
    depth: Cell<usize>,
    // Index being dispatched by the innermost invoke.
    cursor: Cell<Option<usize>>,
}

/// Multicast registry of [`Callback`]s. Clones share the same registry.
pub struct CallbackRegistry<A, S: ?Sized = dyn Any> {
    inner: Rc<Registry<A, S>>,
}

impl<A, S: ?Sized> Clone for CallbackRegistry<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, S: ?Sized> Default for CallbackRegistry<A, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S: ?Sized> CallbackRegistry<A, S> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Registry {
                entries: RefCell::new(Vec::new()),
                live: Cell::new(0),
                tombstones: Cell::new(0),
                depth: Cell::new(0),
                cursor: Cell::new(None),
            }),
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.inner.live.get()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.live.get() == 0
    }

    /// Registered callbacks in dispatch order.
    pub fn invocation_list(&self) -> Vec<Callback<A, S>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Append a registration.
    ///
    /// # Errors
    /// [`Error::InvalidCallback`] if the callback has no function.
    pub fn add(&self, callback: Callback<A, S>) -> Result<()> {
        if !callback.is_valid() {
            return Err(Error::InvalidCallback);
        }
        self.inner.entries.borrow_mut().push(Some(callback));
        self.inner.live.set(self.inner.live.get() + 1);
        Ok(())
    }

    /// Remove one registration of `callback`. Returns whether anything was removed.
    pub fn remove(&self, callback: &Callback<A, S>) -> bool {
        let mut entries = self.inner.entries.borrow_mut();
        let matches = |slot: &Option<Callback<A, S>>| slot.as_ref() == Some(callback);

        let index = match self.inner.cursor.get() {
            Some(cursor) if self.inner.depth.get() > 0 => entries
                .iter()
                .skip(cursor + 1)
                .position(matches)
                .map(|offset| cursor + 1 + offset)
                .or_else(|| entries.iter().take(cursor + 1).position(matches)),
            _ => entries.iter().position(matches),
        };
        let Some(index) = index else {
            return false;
        };

        if self.inner.depth.get() > 0 {
            entries[index] = None;
            self.inner.tombstones.set(self.inner.tombstones.get() + 1);
        } else {
            entries.remove(index);
        }
        self.inner.live.set(self.inner.live.get() - 1);
        true
    }

    /// Drop every registration.
    pub fn clear(&self) {
        let mut entries = self.inner.entries.borrow_mut();
        if self.inner.depth.get() > 0 {
            let cleared = entries.iter_mut().filter(|slot| slot.is_some()).count();
            entries.iter_mut().for_each(|slot| *slot = None);
            self.inner
                .tombstones
                .set(self.inner.tombstones.get() + cleared);
        } else {
            entries.clear();
        }
        self.inner.live.set(0);
    }

    /// Call every registration present when the invoke starts, in registration order.
    pub fn invoke(&self, arg: &A) {
        let count = self.inner.entries.borrow().len();
        let guard = InvokeGuard::enter(&self.inner);
        for index in 0..count {
            guard.at(index);
            let callback = self.inner.entries.borrow().get(index).cloned().flatten();
            if let Some(callback) = callback {
                callback.call(arg);
            }
        }
    }
}

impl<A, S: ?Sized> fmt::Debug for CallbackRegistry<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

struct InvokeGuard<'a, A, S: ?Sized> {
    inner: &'a Registry<A, S>,
    saved_cursor: Option<usize>,
}

impl<'a, A, S: ?Sized> InvokeGuard<'a, A, S> {
    fn enter(inner: &'a Registry<A, S>) -> Self {
        inner.depth.set(inner.depth.get() + 1);
        Self {
            inner,
            saved_cursor: inner.cursor.get(),
        }
    }

    fn at(&self, index: usize) {
        self.inner.cursor.set(Some(index));
    }
}

impl<A, S: ?Sized> Drop for InvokeGuard<'_, A, S> {
    fn drop(&mut self) {
        let depth = self.inner.depth.get() - 1;
        self.inner.depth.set(depth);
        self.inner.cursor.set(self.saved_cursor);
        if depth == 0 && self.inner.tombstones.get() > 0 {
            if let Ok(mut entries) = self.inner.entries.try_borrow_mut() {
                entries.retain(Option::is_some);
                self.inner.tombstones.set(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Spy {
        calls: Cell<usize>,
        registry: RefCell<Option<CallbackRegistry<i32, Spy>>>,
        this: RefCell<Option<Callback<i32, Spy>>>,
    }

    fn count(_: &i32, spy: &Spy) {
        spy.calls.set(spy.calls.get() + 1);
    }

    fn add_self(_: &i32, spy: &Spy) {
        spy.calls.set(spy.calls.get() + 1);
        let registry = spy.registry.borrow().clone();
        let this = spy.this.borrow().clone();
        if let (Some(registry), Some(this)) = (registry, this) {
            registry.add(this).unwrap();
        }
    }

    fn remove_self(_: &i32, spy: &Spy) {
        spy.calls.set(spy.calls.get() + 1);
        let registry = spy.registry.borrow().clone();
        let this = spy.this.borrow().clone();
        if let (Some(registry), Some(this)) = (registry, this) {
            registry.remove(&this);
        }
    }

    fn wired(func: CallbackFn<i32, Spy>) -> (CallbackRegistry<i32, Spy>, Rc<Spy>, Callback<i32, Spy>) {
        let registry = CallbackRegistry::new();
        let spy = Rc::new(Spy::default());
        let callback = Callback::new(func, spy.clone());
        *spy.registry.borrow_mut() = Some(registry.clone());
        *spy.this.borrow_mut() = Some(callback.clone());
        (registry, spy, callback)
    }

    #[test]
    fn duplicate_registrations_run_once_each() {
        let registry = CallbackRegistry::<i32, Spy>::new();
        let spy = Rc::new(Spy::default());
        let callback = Callback::new(count, spy.clone());
        registry.add(callback.clone()).unwrap();
        registry.add(callback).unwrap();
        registry.invoke(&0);
        assert_eq!(spy.calls.get(), 2);
    }

    #[test]
    fn missing_function_is_rejected() {
        let registry = CallbackRegistry::<i32, Spy>::new();
        let callback = Callback::from_parts(None, Rc::new(Spy::default()));
        assert!(matches!(registry.add(callback), Err(Error::InvalidCallback)));
        assert!(registry.is_empty());
    }

    #[test]
    fn removing_absent_entries_is_a_no_op() {
        let registry = CallbackRegistry::<i32, Spy>::new();
        let callback = Callback::new(count, Rc::new(Spy::default()));
        assert!(!registry.remove(&callback));
        registry.add(callback.clone()).unwrap();
        let other = Callback::new(count, Rc::new(Spy::default()));
        assert!(!registry.remove(&other));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn equality_needs_same_function_and_state() {
        let state = Rc::new(Spy::default());
        let a = Callback::new(count, state.clone());
        assert_eq!(a, Callback::new(count, state.clone()));
        assert_ne!(a, Callback::new(add_self, state));
        assert_ne!(a, Callback::new(count, Rc::new(Spy::default())));
    }

    #[test]
    fn added_during_invoke_runs_next_time() {
        let (registry, spy, callback) = wired(add_self);
        registry.add(callback).unwrap();

        registry.invoke(&0);
        assert_eq!(spy.calls.get(), 1);
        assert_eq!(registry.len(), 2);

        registry.invoke(&0);
        assert_eq!(spy.calls.get(), 3);
    }

    #[test]
    fn removing_self_during_invoke_skips_own_duplicate() {
        let (registry, spy, callback) = wired(remove_self);
        registry.add(callback.clone()).unwrap();
        registry.add(callback).unwrap();

        registry.invoke(&0);
        assert_eq!(spy.calls.get(), 1);
        assert_eq!(registry.len(), 1);

        registry.invoke(&0);
        assert_eq!(spy.calls.get(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn removing_an_unreached_entry_takes_effect_immediately() {
        let registry = CallbackRegistry::<i32, Spy>::new();
        let counted = Rc::new(Spy::default());
        let victim = Callback::new(count, counted.clone());

        let remover_state = Rc::new(Spy::default());
        *remover_state.registry.borrow_mut() = Some(registry.clone());
        *remover_state.this.borrow_mut() = Some(victim.clone());
        registry.add(Callback::new(remove_self, remover_state)).unwrap();
        registry.add(victim).unwrap();

        registry.invoke(&0);
        assert_eq!(counted.calls.get(), 0);
        assert_eq!(registry.len(), 1);
    }
}
