//! Fan-in nodes: [`Merge`] and [`CombineLatest`].

use super::multicast::{connect_all, IndexedObserver, Multicast};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Boolean OR of several inputs, emitted every time any input emits.
#[derive(Clone)]
pub struct Merge {
    sources: Rc<[Rc<dyn InputSource<bool>>]>,
    multicast: Rc<Multicast<bool>>,
}

impl Merge {
    pub(crate) fn new(sources: Vec<Rc<dyn InputSource<bool>>>) -> Self {
        Self {
            sources: sources.into(),
            multicast: Multicast::new("merge"),
        }
    }
}

impl InputSource<bool> for Merge {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<bool>>) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let state = Rc::new(MergeState {
                last: (0..self.sources.len()).map(|_| Cell::new(false)).collect(),
                completed: Cell::new(0),
                output,
            });
            connect_all(context, &self.sources, &state)
        })
    }
}

struct MergeState {
    last: Vec<Cell<bool>>,
    completed: Cell<usize>,
    output: ObserverList<bool>,
}

impl IndexedObserver<bool> for MergeState {
    fn on_next_at(&self, index: usize, value: &bool) {
        self.last[index].set(*value);
        let any = self.last.iter().any(Cell::get);
        self.output.on_next(&any);
    }

    fn on_completed_at(&self, _index: usize) {
        let completed = self.completed.get() + 1;
        self.completed.set(completed);
        if completed == self.last.len() {
            self.output.on_completed();
        }
    }

    fn on_error_at(&self, _index: usize, error: &Error) {
        self.output.on_error(error);
    }
}

/// Pairs the latest values of two inputs, emitted every time either input emits.
///
/// An input that has not emitted yet contributes `Default::default()`.
pub struct CombineLatest<A, B> {
    left: Rc<dyn InputSource<A>>,
    right: Rc<dyn InputSource<B>>,
    multicast: Rc<Multicast<(A, B)>>,
}

impl<A, B> Clone for CombineLatest<A, B> {
    fn clone(&self) -> Self {
        Self {
            left: Rc::clone(&self.left),
            right: Rc::clone(&self.right),
            multicast: Rc::clone(&self.multicast),
        }
    }
}

impl<A: 'static, B: 'static> CombineLatest<A, B> {
    pub(crate) fn new(left: Rc<dyn InputSource<A>>, right: Rc<dyn InputSource<B>>) -> Self {
        Self {
            left,
            right,
            multicast: Multicast::new("combine_latest"),
        }
    }
}

impl<A, B> InputSource<(A, B)> for CombineLatest<A, B>
where
    A: Clone + Default + 'static,
    B: Clone + Default + 'static,
{
    fn subscribe(
        &self,
        context: &Context,
        observer: Rc<dyn Observer<(A, B)>>,
    ) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let state = Rc::new(Latest {
                values: RefCell::new((A::default(), B::default())),
                completed: Cell::new(0),
                output,
            });
            let left = self.left.subscribe(
                context,
                Rc::new(LeftPort {
                    state: Rc::clone(&state),
                }),
            )?;
            let right = self
                .right
                .subscribe(context, Rc::new(RightPort { state }))?;
            Ok(Subscription::all(vec![left, right]))
        })
    }
}

struct Latest<A, B> {
    values: RefCell<(A, B)>,
    completed: Cell<usize>,
    output: ObserverList<(A, B)>,
}

impl<A: Clone + 'static, B: Clone + 'static> Latest<A, B> {
    fn emit(&self) {
        let snapshot = self.values.borrow().clone();
        self.output.on_next(&snapshot);
    }

    fn complete_one(&self) {
        let completed = self.completed.get() + 1;
        self.completed.set(completed);
        if completed == 2 {
            self.output.on_completed();
        }
    }
}

struct LeftPort<A, B> {
    state: Rc<Latest<A, B>>,
}

impl<A: Clone + 'static, B: Clone + 'static> Observer<A> for LeftPort<A, B> {
    fn on_next(&self, value: &A) {
        self.state.values.borrow_mut().0 = value.clone();
        self.state.emit();
    }

    fn on_completed(&self) {
        self.state.complete_one();
    }

    fn on_error(&self, error: &Error) {
        self.state.output.on_error(error);
    }
}

struct RightPort<A, B> {
    state: Rc<Latest<A, B>>,
}

impl<A: Clone + 'static, B: Clone + 'static> Observer<B> for RightPort<A, B> {
    fn on_next(&self, value: &B) {
        self.state.values.borrow_mut().1 = value.clone();
        self.state.emit();
    }

    fn on_completed(&self) {
        self.state.complete_one();
    }

    fn on_error(&self, error: &Error) {
        self.state.output.on_error(error);
    }
}
