//! Priority-gated emission.
//!
//! A [`Prioritized`] node does not forward values as they arrive. It queues them on the
//! connected context's deferred queue, which is flushed once per update after all streams
//! were processed. Within one update the highest priority wins: emissions at a lower
//! priority are dropped, so a prioritized shortcut can swallow the plain press of its
//! trigger button.

use super::multicast::Multicast;
use crate::context::{Context, Scheduler};
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::rc::Rc;

pub struct Prioritized<S, T> {
    source: S,
    priority: i32,
    multicast: Rc<Multicast<T>>,
}

impl<S: Clone, T> Clone for Prioritized<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            priority: self.priority,
            multicast: Rc::clone(&self.multicast),
        }
    }
}

impl<S, T: 'static> Prioritized<S, T> {
    pub(crate) fn new(source: S, priority: i32) -> Self {
        Self {
            source,
            priority,
            multicast: Multicast::new("prioritized"),
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl<S, T> InputSource<T> for Prioritized<S, T>
where
    S: InputSource<T>,
    T: Clone + 'static,
{
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<T>>) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let gate = Rc::new(Gate {
                priority: self.priority,
                scheduler: Rc::clone(context.scheduler()),
                output,
            });
            self.source.subscribe(context, gate)
        })
    }
}

struct Gate<T> {
    priority: i32,
    scheduler: Rc<Scheduler>,
    output: ObserverList<T>,
}

impl<T: Clone + 'static> Observer<T> for Gate<T> {
    fn on_next(&self, value: &T) {
        let output = self.output.clone();
        let value = value.clone();
        self.scheduler
            .defer(self.priority, move || output.on_next(&value));
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
    use crate::combinators::{shortcut, InputSourceExt};
    use crate::config::ContextConfig;
    use crate::context::Context;
    use crate::devices::gamepad;
    use crate::observer::ListObserver;
    use crate::source::InputSource;
    use std::rc::Rc;

    #[test]
    fn higher_priority_suppresses_lower_within_an_update() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let shoulder = gamepad::LEFT_SHOULDER.create_stream(&context, false).unwrap();
        let south = gamepad::BUTTON_SOUTH.create_stream(&context, false).unwrap();

        let combo = Rc::new(ListObserver::new());
        let _combo = shortcut([gamepad::LEFT_SHOULDER, gamepad::BUTTON_SOUTH])
            .prioritized(1)
            .subscribe(&context, combo.clone())
            .unwrap();
        let plain = Rc::new(ListObserver::new());
        let _plain = gamepad::BUTTON_SOUTH
            .pressed()
            .prioritized(0)
            .subscribe(&context, plain.clone())
            .unwrap();

        shoulder.offer(true);
        context.update();
        south.offer(true);
        context.update();
        assert_eq!(combo.values(), vec![true]);
        assert!(plain.is_empty());

        // Without the modifier the plain press goes through.
        shoulder.offer(false);
        south.offer(false);
        context.update();
        south.offer(true);
        context.update();
        assert_eq!(plain.len(), 1);
    }

    #[test]
    fn emissions_are_delivered_during_update() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let south = gamepad::BUTTON_SOUTH.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = gamepad::BUTTON_SOUTH
            .prioritized(0)
            .subscribe(&context, observer.clone())
            .unwrap();

        south.offer(true);
        south.offer(false);
        context.update();
        assert_eq!(observer.values(), vec![true, false]);
        assert!(context.scheduler().deferred().is_empty());
    }
}
