//! Press and release detection.

use super::multicast::Multicast;
use crate::context::{Context, Scheduler};
use crate::error::{Error, Result};
use crate::event::{EdgeKind, InputEvent};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::cell::Cell;
use std::rc::Rc;

/// Emits one [`InputEvent`] per rising ([`EdgeKind::Pressed`]) or falling
/// ([`EdgeKind::Released`]) transition of a boolean source.
///
/// Built by [`InputSourceExt::pressed`](super::InputSourceExt::pressed) and
/// [`InputSourceExt::released`](super::InputSourceExt::released).
#[derive(Clone)]
pub struct Edge<S> {
    source: S,
    kind: EdgeKind,
    multicast: Rc<Multicast<InputEvent>>,
}

impl<S> Edge<S> {
    pub(crate) fn pressed(source: S) -> Self {
        Self {
            source,
            kind: EdgeKind::Pressed,
            multicast: Multicast::new("pressed"),
        }
    }

    pub(crate) fn released(source: S) -> Self {
        Self {
            source,
            kind: EdgeKind::Released,
            multicast: Multicast::new("released"),
        }
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }
}

impl<S: InputSource<bool>> InputSource<InputEvent> for Edge<S> {
    fn subscribe(
        &self,
        context: &Context,
        observer: Rc<dyn Observer<InputEvent>>,
    ) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let detector = Rc::new(EdgeDetector {
                rising: self.kind == EdgeKind::Pressed,
                last: Cell::new(false),
                scheduler: Rc::clone(context.scheduler()),
                output,
            });
            self.source.subscribe(context, detector)
        })
    }
}

struct EdgeDetector {
    rising: bool,
    last: Cell<bool>,
    scheduler: Rc<Scheduler>,
    output: ObserverList<InputEvent>,
}

impl Observer<bool> for EdgeDetector {
    fn on_next(&self, value: &bool) {
        let previous = self.last.replace(*value);
        if previous != *value && *value == self.rising {
            let kind = if self.rising {
                EdgeKind::Pressed
            } else {
                EdgeKind::Released
            };
            self.output
                .on_next(&InputEvent::new(kind, self.scheduler.now()));
        }
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
    use crate::event::EdgeKind;
    use crate::observer::ListObserver;
    use crate::source::{Control, InputSource};
    use crate::usage::Usage;
    use std::rc::Rc;

    const BUTTON: Control<bool> = Control::new(Usage::from_parts(0x09, 0x01), "button");

    #[test]
    fn press_fires_once_per_rising_edge() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let node = BUTTON.pressed();
        let mut subscription = node.subscribe(&context, observer.clone()).unwrap();

        writer.offer(true);
        context.update();
        assert_eq!(observer.len(), 1);

        writer.offer(false);
        writer.offer(true);
        writer.offer(false);
        context.update();
        assert_eq!(observer.len(), 2);
        assert!(observer.values().iter().all(|e| e.kind == EdgeKind::Pressed));

        subscription.dispose().unwrap();
        assert_eq!(node.multicast.connections(), 0);
        writer.offer(true);
        writer.offer(false);
        context.update();
        assert_eq!(observer.len(), 2);
    }

    #[test]
    fn release_fires_on_falling_edge_only() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _subscription = BUTTON.released().subscribe(&context, observer.clone()).unwrap();

        writer.offer(true);
        context.update();
        assert!(observer.is_empty());

        writer.offer(false);
        writer.offer(true);
        context.update();
        assert_eq!(observer.len(), 1);
        assert_eq!(observer.values()[0].kind, EdgeKind::Released);
    }

    #[test]
    fn subscribers_in_one_context_share_a_connection() {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let node = BUTTON.pressed();
        let (a, b) = (Rc::new(ListObserver::new()), Rc::new(ListObserver::new()));
        let _sa = node.subscribe(&context, a.clone()).unwrap();
        let _sb = node.subscribe(&context, b.clone()).unwrap();
        assert_eq!(node.multicast.connections(), 1);
        assert_eq!(BUTTON.stream_context(&context).unwrap().observer_count(), 1);

        writer.offer(true);
        context.update();
        assert_eq!((a.len(), b.len()), (1, 1));
    }

    #[test]
    fn disposing_the_context_drops_its_connection() {
        let first = Context::with_config(ContextConfig::default()).unwrap();
        let second = Context::with_config(ContextConfig::default()).unwrap();
        let writer = BUTTON.create_stream(&second, false).unwrap();
        let node = BUTTON.pressed();
        let observer = Rc::new(ListObserver::new());
        let mut stale = node.subscribe(&first, Rc::new(ListObserver::new())).unwrap();
        let _live = node.subscribe(&second, observer.clone()).unwrap();
        assert_eq!(node.multicast.connections(), 2);

        first.dispose();
        assert_eq!(node.multicast.connections(), 1);

        writer.offer(true);
        second.update();
        assert_eq!(observer.len(), 1);

        stale.dispose().unwrap();
        assert_eq!(node.multicast.connections(), 1);
    }
}
