//! Chords and shortcuts over several buttons.
//!
//! Both nodes track the last value of each boolean input and emit `true` when they become
//! satisfied and `false` when they stop being satisfied. They never repeat a value.
//!
//! - A **chord** is satisfied while all inputs are down, whatever order they went down in.
//! - A **shortcut** is additionally order sensitive: inputs must go down in the order they
//!   were given (modifiers first, trigger last). Pressing a modifier while the trigger is
//!   already down does not satisfy it.

use super::multicast::{connect_all, IndexedObserver, Multicast};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ordering {
    Any,
    Sequential,
}

/// Emits whether all of its inputs are down, see [`chord`](super::chord).
#[derive(Clone)]
pub struct Chord {
    sources: Rc<[Rc<dyn InputSource<bool>>]>,
    ordering: Ordering,
    multicast: Rc<Multicast<bool>>,
}

/// Emits whether its inputs went down in order, see [`shortcut`](super::shortcut).
#[derive(Clone)]
pub struct Shortcut(Chord);

impl Chord {
    pub(crate) fn new(sources: Vec<Rc<dyn InputSource<bool>>>) -> Self {
        Self {
            sources: sources.into(),
            ordering: Ordering::Any,
            multicast: Multicast::new("chord"),
        }
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Shortcut {
    pub(crate) fn new(sources: Vec<Rc<dyn InputSource<bool>>>) -> Self {
        Shortcut(Chord {
            sources: sources.into(),
            ordering: Ordering::Sequential,
            multicast: Multicast::new("shortcut"),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl InputSource<bool> for Chord {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<bool>>) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let n = self.sources.len();
            let state = Rc::new(ChordState {
                ordering: self.ordering,
                down: (0..n).map(|_| Cell::new(false)).collect(),
                pressed_at: (0..n).map(|_| Cell::new(0)).collect(),
                sequence: Cell::new(0),
                active: Cell::new(false),
                completed: Cell::new(0),
                output,
            });
            connect_all(context, &self.sources, &state)
        })
    }
}

impl InputSource<bool> for Shortcut {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<bool>>) -> Result<Subscription> {
        self.0.subscribe(context, observer)
    }
}

struct ChordState {
    ordering: Ordering,
    down: Vec<Cell<bool>>,
    pressed_at: Vec<Cell<u64>>,
    sequence: Cell<u64>,
    active: Cell<bool>,
    completed: Cell<usize>,
    output: ObserverList<bool>,
}

impl ChordState {
    fn satisfied(&self) -> bool {
        if !self.down.iter().all(Cell::get) {
            return false;
        }
        match self.ordering {
            Ordering::Any => true,
            Ordering::Sequential => self
                .pressed_at
                .windows(2)
                .all(|pair| pair[0].get() < pair[1].get()),
        }
    }
}

impl IndexedObserver<bool> for ChordState {
    fn on_next_at(&self, index: usize, value: &bool) {
        let was_down = self.down[index].replace(*value);
        if *value && !was_down {
            let sequence = self.sequence.get() + 1;
            self.sequence.set(sequence);
            self.pressed_at[index].set(sequence);
        }

        let satisfied = self.satisfied();
        if satisfied != self.active.get() {
            self.active.set(satisfied);
            self.output.on_next(&satisfied);
        }
    }

    fn on_completed_at(&self, _index: usize) {
        let completed = self.completed.get() + 1;
        self.completed.set(completed);
        if completed == self.down.len() {
            self.output.on_completed();
        }
    }

    fn on_error_at(&self, _index: usize, error: &Error) {
        self.output.on_error(error);
    }
}
