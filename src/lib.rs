//! StickFlow: reactive, frame-driven input pipeline for Rust.
//!
//! Producers offer raw values for a [`Usage`] into per-frame [`Stream`]s; consumers
//! subscribe to [`InputSource`]s and build derived nodes (edges, chords, shortcuts,
//! filters, axes) with [`InputSourceExt`]. Everything is delivered synchronously from
//! [`Context::update`], once per frame, in two phases: process, then advance.
//!
//! ```
//! use std::rc::Rc;
//! use stickflow::devices::gamepad;
//! use stickflow::{Context, InputSource, InputSourceExt, ListObserver};
//!
//! let context = Context::new().unwrap();
//! let south = gamepad::BUTTON_SOUTH.stub(&context).unwrap();
//!
//! let presses = Rc::new(ListObserver::new());
//! let _subscription = gamepad::BUTTON_SOUTH
//!     .pressed()
//!     .subscribe(&context, presses.clone())
//!     .unwrap();
//!
//! south.press();
//! south.release();
//! context.update();
//! assert_eq!(presses.len(), 1);
//! ```

pub mod callback;
pub mod combinators;
pub mod config;
pub mod context;
pub mod deferred;
pub mod devices;
pub mod error;
pub mod event;
pub mod logger;
pub mod observer;
pub mod observer_list;
pub mod source;
pub mod stream;
pub mod stream_context;
pub mod subscription;
pub mod time;
pub mod usage;

pub use callback::{Callback, CallbackRegistry};
pub use combinators::{chord, combine_latest, composite, merge, shortcut, InputSourceExt};
pub use config::ContextConfig;
pub use context::{Context, ContextHandle, ContextId, ContextRegistry, Scheduler, MAX_CONTEXTS};
pub use deferred::DeferredQueue;
pub use error::{Error, Result};
pub use event::{EdgeKind, InputEvent};
pub use logger::LogObserver;
pub use observer::{FnObserver, ListObserver, Notification, Observer};
pub use observer_list::{ObserverId, ObserverList};
pub use source::{Control, InputSource};
pub use stream::{Stream, StreamWriter};
pub use stream_context::StreamContext;
pub use subscription::Subscription;
pub use time::{Clock, ManualClock, MonotonicClock, TimePoint, TimerId, TimerQueue};
pub use usage::{Endpoint, SourceType, Usage};
