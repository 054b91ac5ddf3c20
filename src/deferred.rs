//! Prioritized deferral of emissions.
//!
//! Nodes that should be able to "consume" an input (a shortcut swallowing the plain press of
//! its trigger key) do not emit directly. They queue their emission here with a priority and
//! the owning context flushes the queue once per update:
//! - a higher priority discards everything queued at a lower one;
//! - a lower priority than what is queued is dropped;
//! - equal priorities accumulate in queue order.

use std::cell::{Cell, RefCell};
use std::fmt;

type Action = Box<dyn FnOnce()>;

/// Queue of deferred actions sharing one priority level.
#[derive(Default)]
pub struct DeferredQueue {
    priority: Cell<Option<i32>>,
    actions: RefCell<Vec<Action>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` at `priority`. Returns false if it was dropped in favour of
    /// higher-priority work.
    pub fn defer(&self, priority: i32, action: impl FnOnce() + 'static) -> bool {
        let mut actions = self.actions.borrow_mut();
        match self.priority.get() {
            Some(current) if !actions.is_empty() && priority < current => {
                log::trace!("deferred action at priority {priority} dropped (queued: {current})");
                return false;
            }
            Some(current) if !actions.is_empty() && priority > current => {
                log::trace!(
                    "priority {priority} discards {} deferred action(s) at {current}",
                    actions.len()
                );
                actions.clear();
            }
            _ => {}
        }
        self.priority.set(Some(priority));
        actions.push(Box::new(action));
        true
    }

    pub fn len(&self) -> usize {
        self.actions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.borrow().is_empty()
    }

    /// Priority of the queued actions, if any.
    pub fn priority(&self) -> Option<i32> {
        if self.is_empty() {
            None
        } else {
            self.priority.get()
        }
    }

    /// Run and clear the queue. Actions deferred while flushing are kept for the next flush.
    pub fn invoke(&self) -> usize {
        let actions = std::mem::take(&mut *self.actions.borrow_mut());
        self.priority.set(None);
        let count = actions.len();
        for action in actions {
            action();
        }
        count
    }

    /// Drop the queue without running it.
    pub fn clear(&self) {
        self.actions.borrow_mut().clear();
        self.priority.set(None);
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("priority", &self.priority())
            .field("len", &self.len())
            .finish()
    }
}
