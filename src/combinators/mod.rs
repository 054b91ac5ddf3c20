//! Derived nodes.
//!
//! Combinators describe transformations of other sources and are themselves
//! [`InputSource`]s, so they compose:
//!
//! ```
//! use std::rc::Rc;
//! use stickflow::devices::gamepad;
//! use stickflow::{shortcut, Context, InputSource, InputSourceExt, ListObserver};
//!
//! let context = Context::new().unwrap();
//! let shoulder = gamepad::LEFT_SHOULDER.stub(&context).unwrap();
//! let south = gamepad::BUTTON_SOUTH.stub(&context).unwrap();
//!
//! let presses = Rc::new(ListObserver::new());
//! let _subscription = shortcut([gamepad::LEFT_SHOULDER, gamepad::BUTTON_SOUTH])
//!     .pressed()
//!     .subscribe(&context, presses.clone())
//!     .unwrap();
//!
//! shoulder.press();
//! context.update();
//! south.press();
//! context.update();
//! assert_eq!(presses.len(), 1);
//! ```
//!
//! Nodes connect to their inputs lazily, on the first subscription in a context, and
//! disconnect when the last subscription in that context is disposed.

mod chord;
mod composite;
mod edge;
mod filter;
mod held;
mod merge;
mod multicast;
mod prioritized;

pub use chord::{Chord, Shortcut};
pub use composite::Composite;
pub use edge::Edge;
pub use filter::{Filter, LowPassFilter, Map, DEFAULT_ALPHA};
pub use held::Held;
pub use merge::{CombineLatest, Merge};
pub use prioritized::Prioritized;

use crate::context::Context;
use crate::error::Result;
use crate::observer::FnObserver;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::rc::Rc;
use std::time::Duration;

/// Combinator methods for every [`InputSource`].
pub trait InputSourceExt<T>: InputSource<T> + Sized {
    /// Rising edges of a boolean source.
    fn pressed(self) -> Edge<Self>
    where
        Self: InputSource<bool>,
    {
        Edge::pressed(self)
    }

    /// Falling edges of a boolean source.
    fn released(self) -> Edge<Self>
    where
        Self: InputSource<bool>,
    {
        Edge::released(self)
    }

    /// One event once a boolean source has been down for `duration`.
    fn held(self, duration: Duration) -> Held<Self>
    where
        Self: InputSource<bool>,
    {
        Held::new(self, duration)
    }

    /// Only the values for which `predicate` holds.
    fn filter<F>(self, predicate: F) -> Filter<Self, T, F>
    where
        T: 'static,
        F: Fn(&T) -> bool + 'static,
    {
        Filter::new(self, predicate)
    }

    /// `f(value)` for every value.
    fn map<U, F>(self, f: F) -> Map<Self, T, U, F>
    where
        U: 'static,
        F: Fn(&T) -> U + 'static,
    {
        Map::new(self, f)
    }

    /// Exponential smoothing with [`DEFAULT_ALPHA`].
    fn low_pass_filter(self) -> LowPassFilter<Self>
    where
        Self: InputSource<f32>,
    {
        LowPassFilter::new(self, DEFAULT_ALPHA)
    }

    /// Exponential smoothing with factor `alpha`, clamped to `[0, 1]`.
    fn low_pass_filter_with(self, alpha: f32) -> LowPassFilter<Self>
    where
        Self: InputSource<f32>,
    {
        LowPassFilter::new(self, alpha)
    }

    /// Route emissions through the context's deferred queue at `priority`.
    fn prioritized(self, priority: i32) -> Prioritized<Self, T>
    where
        T: 'static,
    {
        Prioritized::new(self, priority)
    }

    /// Type-erase the source, e.g. to mix different node types in one [`chord`].
    fn shared(self) -> Rc<dyn InputSource<T>>
    where
        Self: 'static,
    {
        Rc::new(self)
    }

    /// Subscribe a closure.
    fn subscribe_fn<F>(&self, context: &Context, f: F) -> Result<Subscription>
    where
        T: 'static,
        F: Fn(&T) + 'static,
    {
        self.subscribe(context, Rc::new(FnObserver::new(f)))
    }
}

impl<T, S: InputSource<T>> InputSourceExt<T> for S {}

fn erase<I>(sources: I) -> Vec<Rc<dyn InputSource<bool>>>
where
    I: IntoIterator,
    I::Item: InputSource<bool> + 'static,
{
    sources
        .into_iter()
        .map(|source| Rc::new(source) as Rc<dyn InputSource<bool>>)
        .collect()
}

/// `true` while all `sources` are down, in any order.
pub fn chord<I>(sources: I) -> Chord
where
    I: IntoIterator,
    I::Item: InputSource<bool> + 'static,
{
    Chord::new(erase(sources))
}

/// `true` while all `sources` are down, if they went down in the given order.
pub fn shortcut<I>(sources: I) -> Shortcut
where
    I: IntoIterator,
    I::Item: InputSource<bool> + 'static,
{
    Shortcut::new(erase(sources))
}

/// OR of the latest values of `sources`, emitted on every input.
pub fn merge<I>(sources: I) -> Merge
where
    I: IntoIterator,
    I::Item: InputSource<bool> + 'static,
{
    Merge::new(erase(sources))
}

/// Latest values of `left` and `right` as a pair, emitted on every input.
pub fn combine_latest<A, B>(
    left: impl InputSource<A> + 'static,
    right: impl InputSource<B> + 'static,
) -> CombineLatest<A, B>
where
    A: 'static,
    B: 'static,
{
    CombineLatest::new(Rc::new(left), Rc::new(right))
}

/// Axis from a negative and a positive button.
pub fn composite(
    negative: impl InputSource<bool> + 'static,
    positive: impl InputSource<bool> + 'static,
) -> Composite {
    Composite::new(Rc::new(negative), Rc::new(positive))
}
