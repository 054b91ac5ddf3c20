//! One-dimensional axis composed from two buttons.

use super::multicast::{connect_all, IndexedObserver, Multicast};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::cell::Cell;
use std::rc::Rc;

const NEGATIVE: usize = 0;
const POSITIVE: usize = 1;

/// Axis in `{-1.0, 0.0, 1.0}` driven by a negative and a positive button.
///
/// Emits `positive - negative` whenever either button emits; both down cancels out to `0.0`.
#[derive(Clone)]
pub struct Composite {
    sources: Rc<[Rc<dyn InputSource<bool>>]>,
    multicast: Rc<Multicast<f32>>,
}

impl Composite {
    pub(crate) fn new(negative: Rc<dyn InputSource<bool>>, positive: Rc<dyn InputSource<bool>>) -> Self {
        Self {
            sources: Rc::from(vec![negative, positive]),
            multicast: Multicast::new("composite"),
        }
    }
}

impl InputSource<f32> for Composite {
    fn subscribe(&self, context: &Context, observer: Rc<dyn Observer<f32>>) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let axis = Rc::new(Axis {
                down: [Cell::new(false), Cell::new(false)],
                output,
            });
            connect_all(context, &self.sources, &axis)
        })
    }
}

struct Axis {
    down: [Cell<bool>; 2],
    output: ObserverList<f32>,
}

impl IndexedObserver<bool> for Axis {
    fn on_next_at(&self, index: usize, value: &bool) {
        self.down[index].set(*value);
        let level = |side: usize| if self.down[side].get() { 1.0 } else { 0.0 };
        self.output.on_next(&(level(POSITIVE) - level(NEGATIVE)));
    }

    fn on_error_at(&self, _index: usize, error: &Error) {
        self.output.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use crate::combinators::composite;
    use crate::config::ContextConfig;
    use crate::context::Context;
    use crate::devices::gamepad;
    use crate::observer::ListObserver;
    use crate::source::InputSource;
    use std::rc::Rc;

    #[test]
    fn axis_follows_both_buttons() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let west = gamepad::BUTTON_WEST.create_stream(&context, false).unwrap();
        let east = gamepad::BUTTON_EAST.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = composite(gamepad::BUTTON_WEST, gamepad::BUTTON_EAST)
            .subscribe(&context, observer.clone())
            .unwrap();

        west.offer(true);
        context.update();
        east.offer(true);
        context.update();
        west.offer(false);
        context.update();
        east.offer(false);
        context.update();
        assert_eq!(observer.values(), vec![-1.0, 0.0, 1.0, 0.0]);
    }
}
