//! Hold detection.

use super::multicast::Multicast;
use crate::context::{Context, Scheduler};
use crate::error::{Error, Result};
use crate::event::{EdgeKind, InputEvent};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use crate::time::TimerId;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Emits one [`EdgeKind::Held`] event when a boolean source stays `true` for at least
/// `duration`.
///
/// The hold starts on the rising edge, measured with the connected context's clock. A
/// release before the duration elapses cancels it. Expiry is checked once per update, so
/// the event is emitted by the first update at or after the deadline.
#[derive(Clone)]
pub struct Held<S> {
    source: S,
    duration: Duration,
    multicast: Rc<Multicast<InputEvent>>,
}

impl<S> Held<S> {
    pub(crate) fn new(source: S, duration: Duration) -> Self {
        Self {
            source,
            duration,
            multicast: Multicast::new("held"),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<S: InputSource<bool>> InputSource<InputEvent> for Held<S> {
    fn subscribe(
        &self,
        context: &Context,
        observer: Rc<dyn Observer<InputEvent>>,
    ) -> Result<Subscription> {
        self.multicast.subscribe(context, observer, |output| {
            let detector = Rc::new(HoldDetector {
                duration: self.duration,
                down: Cell::new(false),
                timer: Cell::new(None),
                scheduler: Rc::clone(context.scheduler()),
                output,
            });
            self.source.subscribe(context, detector)
        })
    }
}

struct HoldDetector {
    duration: Duration,
    down: Cell<bool>,
    timer: Cell<Option<TimerId>>,
    scheduler: Rc<Scheduler>,
    output: ObserverList<InputEvent>,
}

impl Observer<bool> for HoldDetector {
    fn on_next(&self, value: &bool) {
        let was_down = self.down.replace(*value);
        match (was_down, *value) {
            (false, true) => {
                let output = self.output.clone();
                let timer = self.scheduler.schedule_after(self.duration, move |at| {
                    output.on_next(&InputEvent::new(EdgeKind::Held, at));
                });
                self.timer.set(Some(timer));
            }
            (true, false) => {
                if let Some(timer) = self.timer.take() {
                    self.scheduler.cancel(timer);
                }
            }
            _ => {}
        }
    }

    fn on_completed(&self) {
        if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
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
    use crate::time::{ManualClock, TimePoint};
    use crate::usage::Usage;
    use std::rc::Rc;
    use std::time::Duration;

    const BUTTON: Control<bool> = Control::new(Usage::from_parts(0x09, 0x02), "button");

    fn setup() -> (Context, Rc<ManualClock>) {
        let context = Context::with_config(ContextConfig::default()).unwrap();
        let clock = Rc::new(ManualClock::new());
        context.set_clock(clock.clone());
        (context, clock)
    }

    #[test]
    fn emits_once_after_duration() {
        let (context, clock) = setup();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = BUTTON
            .held(Duration::from_millis(10))
            .subscribe(&context, observer.clone())
            .unwrap();

        writer.offer(true);
        context.update();
        assert!(observer.is_empty());

        clock.advance(Duration::from_millis(9));
        context.update();
        assert!(observer.is_empty());

        clock.advance(Duration::from_millis(1));
        context.update();
        context.update();
        let events = observer.values();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EdgeKind::Held);
        assert_eq!(events[0].at, TimePoint::from_micros(10_000));
    }

    #[test]
    fn release_before_deadline_cancels() {
        let (context, clock) = setup();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = BUTTON
            .held(Duration::from_millis(1))
            .subscribe(&context, observer.clone())
            .unwrap();

        writer.offer(true);
        context.update();
        writer.offer(false);
        context.update();
        clock.advance(Duration::from_millis(5));
        context.update();
        assert!(observer.is_empty());
        assert!(context.scheduler().timers().is_empty());

        // A new hold starts from the next press.
        writer.offer(true);
        context.update();
        clock.advance(Duration::from_millis(1));
        context.update();
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn zero_duration_fires_in_the_same_update() {
        let (context, _clock) = setup();
        let writer = BUTTON.create_stream(&context, false).unwrap();
        let observer = Rc::new(ListObserver::new());
        let _sub = BUTTON
            .held(Duration::ZERO)
            .subscribe(&context, observer.clone())
            .unwrap();

        writer.offer(true);
        context.update();
        assert_eq!(observer.len(), 1);
    }
}
