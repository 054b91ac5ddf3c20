//! Per-value transforms: [`Filter`], [`Map`] and [`LowPassFilter`].

use super::multicast::Multicast;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

/// Forwards only the values that satisfy a predicate.
pub struct Filter<S, T, F> {
    source: S,
    predicate: Rc<F>,
    multicast: Rc<Multicast<T>>,
}

impl<S: Clone, T, F> Clone for Filter<S, T, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            predicate: Rc::clone(&self.predicate),
            multicast: Rc::clone(&self.multicast),
        }
    }
}

impl<S, T: 'static, F> Filter<S, T, F> {
    pub(crate) fn new(source: S, predicate: F) -> Self {
        Self {
            source,
            predicate: Rc::new(predicate),
            multicast: Multicast::new("filter"),
        }
    }
}

impl<S, T, F> InputSource<T> for Filter<S, T, F>
where
    S: InputSource<T>,
    T: 'static,
    F: Fn(&T) -> bool + 'static,
{
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let stage = Rc::new(FilterStage {
                predicate: Rc::clone(&self.predicate),
                output,
            });
            self.source.subscribe(context, stage)
        })
    }
}

struct FilterStage<T, F> {
    predicate: Rc<F>,
    output: ObserverList<T>,
}

impl<T: 'static, F: Fn(&T) -> bool> Observer<T> for FilterStage<T, F> {
    fn on_next(&self, value: &T) {
        if (self.predicate)(value) {
            self.output.on_next(value);
        }
    }

    fn on_completed(&self) {
        self.output.on_completed();
    }

    fn on_error(&self, error: &Error) {
        self.output.on_error(error);
    }
}

/// Forwards `f(value)` for every value.
pub struct Map<S, In, Out, F> {
    source: S,
    f: Rc<F>,
    multicast: Rc<Multicast<Out>>,
    _input: PhantomData<fn(&In)>,
}

impl<S: Clone, In, Out, F> Clone for Map<S, In, Out, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            f: Rc::clone(&self.f),
            multicast: Rc::clone(&self.multicast),
            _input: PhantomData,
        }
    }
}

impl<S, In, Out: 'static, F> Map<S, In, Out, F> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Self {
            source,
            f: Rc::new(f),
            multicast: Multicast::new("map"),
            _input: PhantomData,
        }
    }
}

impl<S, In, Out, F> InputSource<Out> for Map<S, In, Out, F>
where
    S: InputSource<In>,
    In: 'static,
    Out: 'static,
    F: Fn(&In) -> Out + 'static,
{
    fn subscribe(
        &self,
        context: &Context,
        observer: Rc<dyn Observer<Out>>,
    ) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let stage = Rc::new(MapStage {
                f: Rc::clone(&self.f),
                output,
                _input: PhantomData,
            });
            self.source.subscribe(context, stage)
        })
    }
}

struct MapStage<In, Out, F> {
    f: Rc<F>,
    output: ObserverList<Out>,
    _input: PhantomData<fn(&In)>,
}

impl<In, Out: 'static, F: Fn(&In) -> Out> Observer<In> for MapStage<In, Out, F> {
    fn on_next(&self, value: &In) {
        self.output.on_next(&(self.f)(value));
    }

    fn on_completed(&self) {
        self.output.on_completed();
    }

    fn on_error(&self, error: &Error) {
        self.output.on_error(error);
    }
}

/// Default smoothing factor of [`LowPassFilter`].
pub const DEFAULT_ALPHA: f32 = 0.5;

/// Exponential smoothing of an `f32` source: `y += alpha * (x - y)`.
///
/// The first value after connecting is passed through unsmoothed and seeds the filter.
#[derive(Clone)]
pub struct LowPassFilter<S> {
    source: S,
    alpha: f32,
    multicast: Rc<Multicast<f32>>,
}

impl<S> LowPassFilter<S> {
    pub(crate) fn new(source: S, alpha: f32) -> Self {
        Self {
            source,
            alpha: alpha.clamp(0.0, 1.0),
            multicast: Multicast::new("low_pass_filter"),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl<S: InputSource<f32>> InputSource<f32> for LowPassFilter<S> {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<f32>>) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let stage = Rc::new(LowPassStage {
                alpha: self.alpha,
                state: Cell::new(None),
                output,
            });
            self.source.subscribe(context, stage)
        })
    }
}

struct LowPassStage {
    alpha: f32,
    state: Cell<Option<f32>>,
    output: ObserverList<f32>,
}

impl Observer<f32> for LowPassStage {
    fn on_next(&self, value: &f32) {
        let smoothed = match self.state.get() {
            Some(previous) => previous + self.alpha * (*value - previous),
            None => *value,
        };
        self.state.set(Some(smoothed));
        self.output.on_next(&smoothed);
    }

    fn on_completed(&self) {
        self.output.on_completed();
    }

    fn on_error(&self, error: &Error) {
        self.output.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use crate::combinators::InputSourceExt;
    use crate::config::ContextConfig;
    use crate::context::Context;
    use crate::devices::gamepad::{self, Vec2};
    use crate::observer::ListObserver;
    use crate::source::InputSource;
    use rstest::rstest;
    use std::rc::Rc;

    fn stick_values() -> [Vec2; 4] {
        [
            Vec2::new(0.4, 0.0),
            Vec2::new(0.5, 0.0),
            Vec2::new(0.6, 0.1),
            Vec2::new(0.3, 0.2),
        ]
    }

    #[test]
    fn filter_forwards_matching_values() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let stick = gamepad::LEFT_STICK
            .create_stream(&context, Vec2::default())
            .unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = gamepad::LEFT_STICK
            .filter(|v: &Vec2| v.x >= 0.5)
            .subscribe(&context, observer.clone())
            .unwrap();

        stick_values().into_iter().for_each(|v| stick.offer(v));
        context.update();
        assert_eq!(
            observer.values(),
            vec![Vec2::new(0.5, 0.0), Vec2::new(0.6, 0.1)]
        );
    }

    #[test]
    fn map_converts_every_value() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let stick = gamepad::LEFT_STICK
            .create_stream(&context, Vec2::default())
            .unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = gamepad::LEFT_STICK
            .map(|v: &Vec2| v.x)
            .subscribe(&context, observer.clone())
            .unwrap();

        stick_values().into_iter().for_each(|v| stick.offer(v));
        context.update();
        assert_eq!(observer.values(), vec![0.4, 0.5, 0.6, 0.3]);
    }

    #[rstest]
    #[case::default_alpha(0.5, vec![0.0, 0.05, 0.125, 0.5125, 0.50625])]
    #[case::no_smoothing(1.0, vec![0.0, 0.1, 0.2, 0.9, 0.5])]
    #[case::frozen(0.0, vec![0.0, 0.0, 0.0, 0.0, 0.0])]
    fn low_pass_filter_smooths_after_first_value(#[case] alpha: f32, #[case] expected: Vec<f32>) {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let trigger = gamepad::LEFT_TRIGGER.create_stream(&context, 0.0).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = gamepad::LEFT_TRIGGER
            .low_pass_filter_with(alpha)
            .subscribe(&context, observer.clone())
            .unwrap();

        for v in [0.0, 0.1, 0.2, 0.9, 0.5] {
            trigger.offer(v);
        }
        context.update();
        let values = observer.values();
        assert_eq!(values.len(), expected.len());
        for (got, want) in values.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }
}
