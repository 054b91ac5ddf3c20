//! Multicast observer bookkeeping.
//!
//! [`ObserverList`] is the fan-out primitive behind stream contexts and every derived node.
//! It is a cheap, clonable handle: clones share the same list.
//!
//! # Reentrancy
//! Observers may add or remove observers (including themselves) while being notified:
//! - the number of observers notified is fixed when a broadcast starts, so observers added
//!   during a broadcast are first notified by the next one;
//! - an observer removed during a broadcast is skipped if it has not been reached yet.
//!
//! While any broadcast is running, removed entries are tombstoned instead of shifted so
//! indices stay stable; the list is compacted when the outermost broadcast ends.
//!
//! # Teardown
//! A list may carry a teardown callback that runs exactly once, on the transition to zero
//! observers. Derived nodes use it to drop their upstream subscriptions once nobody listens.

use crate::error::{Error, Result};
use crate::observer::{Notification, Observer};
use crate::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifies one registration in an [`ObserverList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Entry<T> {
    id: ObserverId,
    observer: Rc<dyn Observer<T>>,
}

struct Inner<T> {
    entries: RefCell<Vec<Option<Entry<T>>>>,
    live: Cell<usize>,
    tombstones: Cell<usize>,
    dispatch_depth: Cell<usize>,
    next_id: Cell<u64>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Multicasts notifications to registered observers in registration order.
pub struct ObserverList<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for ObserverList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                entries: RefCell::new(Vec::new()),
                live: Cell::new(0),
                tombstones: Cell::new(0),
                dispatch_depth: Cell::new(0),
                next_id: Cell::new(1),
                teardown: RefCell::new(None),
            }),
        }
    }

    /// A list that runs `teardown` when its last observer is removed.
    pub fn with_teardown(teardown: impl FnOnce() + 'static) -> Self {
        let list = Self::new();
        list.set_teardown(teardown);
        list
    }

    /// Install (or replace) the zero-observer teardown callback.
    pub fn set_teardown(&self, teardown: impl FnOnce() + 'static) {
        *self.inner.teardown.borrow_mut() = Some(Box::new(teardown));
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.inner.live.get()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.live.get() == 0
    }

    /// True if both handles refer to the same list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Ids of the registered observers, in notification order.
    pub fn ids(&self) -> Vec<ObserverId> {
        self.inner
            .entries
            .borrow()
            .iter()
            .flatten()
            .map(|entry| entry.id)
            .collect()
    }
}

impl<T: 'static> ObserverList<T> {
    /// Register an observer. The same observer may be added more than once.
    pub fn add(&self, observer: Rc<dyn Observer<T>>) -> Subscription {
        let id = ObserverId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .entries
            .borrow_mut()
            .push(Some(Entry { id, observer }));
        self.inner.live.set(self.inner.live.get() + 1);

        let list = self.clone();
        Subscription::new(move || list.remove(id))
    }

    /// Unregister an observer.
    ///
    /// # Errors
    /// [`Error::ObserverListEmpty`] if the list is empty, [`Error::ObserverNotRegistered`] if
    /// `id` is not registered. Both indicate a double unsubscribe.
    pub fn remove(&self, id: ObserverId) -> Result<()> {
        if self.inner.live.get() == 0 {
            return Err(Error::ObserverListEmpty);
        }
        {
            let mut entries = self.inner.entries.borrow_mut();
            let index = entries
                .iter()
                .position(|slot| matches!(slot, Some(entry) if entry.id == id))
                .ok_or(Error::ObserverNotRegistered(id))?;
            if self.inner.dispatch_depth.get() > 0 {
                entries[index] = None;
                self.inner.tombstones.set(self.inner.tombstones.get() + 1);
            } else {
                entries.remove(index);
            }
        }
        self.inner.live.set(self.inner.live.get() - 1);

        if self.inner.live.get() == 0 {
            let teardown = self.inner.teardown.borrow_mut().take();
            if let Some(teardown) = teardown {
                teardown();
            }
        }
        Ok(())
    }

    /// Broadcast a notification to every observer registered when the broadcast starts.
    pub fn broadcast(&self, notification: Notification<'_, T>) {
        let count = self.inner.entries.borrow().len();
        let _guard = DispatchGuard::enter(&self.inner);
        for index in 0..count {
            let observer = self
                .inner
                .entries
                .borrow()
                .get(index)
                .and_then(|slot| slot.as_ref())
                .map(|entry| Rc::clone(&entry.observer));
            if let Some(observer) = observer {
                observer.notify(notification);
            }
        }
    }
}

impl<T: 'static> Observer<T> for ObserverList<T> {
    fn on_next(&self, value: &T) {
        self.broadcast(Notification::Next(value));
    }

    fn on_completed(&self) {
        self.broadcast(Notification::Completed);
    }

    fn on_error(&self, error: &Error) {
        self.broadcast(Notification::Error(error));
    }
}

impl<T> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.len())
            .finish()
    }
}

/// Tracks broadcast nesting; compacts tombstones when the outermost broadcast ends, even if
/// an observer panics.
struct DispatchGuard<'a, T> {
    inner: &'a Inner<T>,
}

impl<'a, T> DispatchGuard<'a, T> {
    fn enter(inner: &'a Inner<T>) -> Self {
        inner.dispatch_depth.set(inner.dispatch_depth.get() + 1);
        Self { inner }
    }
}

impl<T> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        let depth = self.inner.dispatch_depth.get() - 1;
        self.inner.dispatch_depth.set(depth);
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
    use crate::observer::ListObserver;

    fn recorder() -> Rc<ListObserver<i32>> {
        Rc::new(ListObserver::new())
    }

    #[test]
    fn broadcasts_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let list = ObserverList::<i32>::new();
        let mut subs = Vec::new();
        for tag in 0..3 {
            let order = order.clone();
            subs.push(list.add(Rc::new(crate::observer::FnObserver::new(
                move |v: &i32| order.borrow_mut().push((tag, *v)),
            ))));
        }
        list.on_next(&10);
        assert_eq!(*order.borrow(), vec![(0, 10), (1, 10), (2, 10)]);
    }

    #[test]
    fn completed_and_error_reach_every_observer() {
        let list = ObserverList::<i32>::new();
        let a = recorder();
        let b = recorder();
        let _sa = list.add(a.clone());
        let _sb = list.add(b.clone());
        list.on_completed();
        list.on_error(&Error::InvalidCallback);
        for o in [a, b] {
            assert_eq!(o.completed(), 1);
            assert_eq!(o.errors().len(), 1);
        }
    }

    #[test]
    fn dispose_removes_observer_and_runs_teardown_once() {
        let torn_down = Rc::new(Cell::new(0));
        let t = torn_down.clone();
        let list = ObserverList::<i32>::with_teardown(move || t.set(t.get() + 1));
        let a = recorder();
        let mut s1 = list.add(a.clone());
        let mut s2 = list.add(a.clone());
        list.on_next(&1);
        assert_eq!(a.values(), vec![1, 1]);

        s1.dispose().unwrap();
        assert_eq!(torn_down.get(), 0);
        s2.dispose().unwrap();
        assert_eq!(torn_down.get(), 1);
        s2.dispose().unwrap();
        assert_eq!(torn_down.get(), 1);

        list.on_next(&2);
        assert_eq!(a.values(), vec![1, 1]);
    }

    #[test]
    fn removing_unknown_or_from_empty_is_an_error() {
        let list = ObserverList::<i32>::new();
        assert!(matches!(
            list.remove(ObserverId(99)),
            Err(Error::ObserverListEmpty)
        ));
        let _sub = list.add(recorder());
        assert!(matches!(
            list.remove(ObserverId(99)),
            Err(Error::ObserverNotRegistered(ObserverId(99)))
        ));
    }

    struct SelfRemoving {
        list: ObserverList<i32>,
        subscription: RefCell<Option<Subscription>>,
        seen: Cell<usize>,
    }

    impl Observer<i32> for SelfRemoving {
        fn on_next(&self, _: &i32) {
            self.seen.set(self.seen.get() + 1);
            if let Some(mut sub) = self.subscription.borrow_mut().take() {
                sub.dispose().unwrap();
            }
        }
    }

    #[test]
    fn observer_can_unsubscribe_itself_during_broadcast() {
        let list = ObserverList::<i32>::new();
        let before = recorder();
        let after = recorder();
        let _s0 = list.add(before.clone());
        let me = Rc::new(SelfRemoving {
            list: list.clone(),
            subscription: RefCell::new(None),
            seen: Cell::new(0),
        });
        *me.subscription.borrow_mut() = Some(me.list.add(me.clone()));
        let _s2 = list.add(after.clone());

        list.on_next(&1);
        list.on_next(&2);
        assert_eq!(me.seen.get(), 1);
        assert_eq!(before.values(), vec![1, 2]);
        assert_eq!(after.values(), vec![1, 2]);
        assert_eq!(list.len(), 2);
    }

    struct Adder {
        list: ObserverList<i32>,
        added: RefCell<Vec<Subscription>>,
        late: Rc<ListObserver<i32>>,
    }

    impl Observer<i32> for Adder {
        fn on_next(&self, _: &i32) {
            self.added.borrow_mut().push(self.list.add(self.late.clone()));
        }
    }

    #[test]
    fn observers_added_during_broadcast_wait_for_the_next_one() {
        let list = ObserverList::<i32>::new();
        let late = recorder();
        let adder = Rc::new(Adder {
            list: list.clone(),
            added: RefCell::new(Vec::new()),
            late: late.clone(),
        });
        let _s = list.add(adder.clone());

        list.on_next(&1);
        assert!(late.is_empty());
        list.on_next(&2);
        assert_eq!(late.values(), vec![2]);
    }
}
