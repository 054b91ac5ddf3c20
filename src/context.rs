//! Session registry and the per-frame update.
//!
//! A [`Context`] owns every [`Stream`] and [`StreamContext`] of one session. Producers
//! register streams with [`Context::create_stream`]; consumers attach through
//! [`Context::get_or_create_stream_context`], usually indirectly via
//! [`InputSource::subscribe`](crate::InputSource::subscribe). Nothing is delivered until
//! [`Context::update`] runs.
//!
//! # Update
//! ```text
//! 1. process  every stream context      (observers see pending values)
//! 2. fire     expired timers
//! 3. flush    deferred, prioritized emissions
//! 4. advance  every stream context      (pending values become history)
//! ```
//! Processing and advancing are two full passes, never interleaved per stream, so every
//! subscriber sees a settled set of pending values before any buffer is cleared.
//!
//! # Slots
//! Live contexts are bounded by the [`ContextRegistry`] they are created from. The default
//! registry ([`ContextRegistry::global`]) has [`MAX_CONTEXTS`] slots per thread and is shared
//! by [`Context::new`], [`Context::with_config`] and [`Context::instance`]; only
//! [`Context::with_registry`] uses another one. A context gives its slot back when disposed
//! or dropped.
//!
//! # Examples
//! ```
//! use std::rc::Rc;
//! use stickflow::{Context, InputSource, ListObserver, Usage};
//!
//! let context = Context::new().unwrap();
//! let button = Usage::from_parts(0x09, 0x01);
//! let writer = context.create_stream(button, false).unwrap();
//!
//! let observer = Rc::new(ListObserver::new());
//! let _subscription = writer.subscribe(&context, observer.clone()).unwrap();
//!
//! writer.offer(true);
//! writer.offer(false);
//! assert!(observer.is_empty());
//!
//! context.update();
//! assert_eq!(observer.values(), vec![true, false]);
//! ```

use crate::config::ContextConfig;
use crate::deferred::DeferredQueue;
use crate::error::{Error, Result};
use crate::stream::{Stream, StreamWriter};
use crate::stream_context::{AnyStreamContext, StreamContext};
use crate::time::{Clock, MonotonicClock, TimePoint, TimerId, TimerQueue};
use crate::usage::Usage;
use indexmap::IndexMap;
use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Slots of the default registry.
pub const MAX_CONTEXTS: usize = 4;

/// Process-unique identity of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// 1-based index of a registry slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(usize);

impl ContextHandle {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

/// Fixed-capacity arena of context slots.
pub struct ContextRegistry {
    slots: RefCell<Vec<Option<ContextId>>>,
}

thread_local! {
    static GLOBAL_REGISTRY: RefCell<Option<Rc<ContextRegistry>>> = const { RefCell::new(None) };
    static INSTANCE: RefCell<Option<Rc<Context>>> = const { RefCell::new(None) };
}

impl ContextRegistry {
    pub fn new(capacity: usize) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(vec![None; capacity]),
        })
    }

    /// The default registry of the calling thread.
    ///
    /// Created with [`MAX_CONTEXTS`] slots unless [`Context::with_config`] created it first.
    pub fn global() -> Rc<Self> {
        Self::global_or_init(MAX_CONTEXTS)
    }

    // `capacity` only applies if the thread has no default registry yet.
    fn global_or_init(capacity: usize) -> Rc<Self> {
        GLOBAL_REGISTRY.with(|global| {
            let mut global = global.borrow_mut();
            Rc::clone(global.get_or_insert_with(|| Self::new(capacity)))
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Number of occupied slots.
    pub fn live_count(&self) -> usize {
        self.slots.borrow().iter().flatten().count()
    }

    pub fn is_live(&self, handle: ContextHandle) -> bool {
        handle
            .0
            .checked_sub(1)
            .and_then(|index| self.slots.borrow().get(index).copied())
            .flatten()
            .is_some()
    }

    fn acquire(&self, id: ContextId) -> Result<ContextHandle> {
        let mut slots = self.slots.borrow_mut();
        let max = slots.len();
        let (index, slot) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(Error::ContextCapacity { max })?;
        *slot = Some(id);
        Ok(ContextHandle(index + 1))
    }

    // Only frees the slot if it still belongs to `id`.
    fn release(&self, handle: ContextHandle, id: ContextId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let slot = match handle.0.checked_sub(1) {
            Some(index) => slots.get_mut(index),
            None => None,
        };
        match slot {
            Some(slot) if *slot == Some(id) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("capacity", &self.capacity())
            .field("live", &self.live_count())
            .finish()
    }
}

/// Clock, timers and deferred emissions of one context.
///
/// Derived nodes keep an `Rc` to the scheduler of the context they are connected to, so
/// they can read time and queue work without borrowing the context itself.
pub struct Scheduler {
    clock: RefCell<Rc<dyn Clock>>,
    timers: TimerQueue,
    deferred: DeferredQueue,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            clock: RefCell::new(Rc::new(MonotonicClock::new())),
            timers: TimerQueue::new(),
            deferred: DeferredQueue::new(),
        }
    }

    pub fn now(&self) -> TimePoint {
        let clock = self.clock.borrow().clone();
        clock.now()
    }

    /// Run `callback` on the first update at or after `now() + delay`.
    pub fn schedule_after(
        &self,
        delay: Duration,
        callback: impl FnOnce(TimePoint) + 'static,
    ) -> TimerId {
        self.timers.schedule(self.now() + delay, callback)
    }

    pub fn cancel(&self, timer: TimerId) -> bool {
        self.timers.cancel(timer)
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// See [`DeferredQueue::defer`].
    pub fn defer(&self, priority: i32, action: impl FnOnce() + 'static) -> bool {
        self.deferred.defer(priority, action)
    }

    pub fn deferred(&self) -> &DeferredQueue {
        &self.deferred
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("timers", &self.timers)
            .field("deferred", &self.deferred)
            .finish()
    }
}

type DisposeHooks = RefCell<IndexMap<u64, Box<dyn FnOnce()>>>;

/// Registration of an action run when its context is disposed. Dropping it unregisters the
/// action.
pub(crate) struct DisposeHook {
    hooks: Weak<DisposeHooks>,
    node: u64,
}

impl Drop for DisposeHook {
    fn drop(&mut self) {
        if let Some(hooks) = self.hooks.upgrade() {
            let removed = hooks.borrow_mut().shift_remove(&self.node);
            drop(removed);
        }
    }
}

/// One input session.
pub struct Context {
    id: ContextId,
    handle: Cell<Option<ContextHandle>>,
    registry: Rc<ContextRegistry>,
    config: ContextConfig,
    streams: RefCell<IndexMap<Usage, Rc<dyn Any>>>,
    stream_contexts: RefCell<IndexMap<Usage, Rc<dyn AnyStreamContext>>>,
    scheduler: Rc<Scheduler>,
    next_node: Cell<u64>,
    dispose_hooks: Rc<DisposeHooks>,
}

impl Context {
    /// Create a context in the calling thread's default registry.
    ///
    /// # Errors
    /// [`Error::ContextCapacity`] if [`MAX_CONTEXTS`] contexts are already live.
    pub fn new() -> Result<Self> {
        Self::with_config(ContextConfig::default())
    }

    /// Create a context in the calling thread's default registry.
    ///
    /// `config.max_contexts` sizes the default registry only if this call creates it; an
    /// existing registry keeps its capacity.
    ///
    /// # Errors
    /// [`Error::ContextCapacity`] if the default registry is full.
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        let registry = ContextRegistry::global_or_init(config.max_contexts);
        if registry.capacity() != config.max_contexts {
            log::debug!(
                "default registry already has {} slots, ignoring max_contexts = {}",
                registry.capacity(),
                config.max_contexts
            );
        }
        Self::with_registry(registry, config)
    }

    pub fn with_registry(registry: Rc<ContextRegistry>, config: ContextConfig) -> Result<Self> {
        let id = ContextId::next();
        let handle = registry.acquire(id)?;
        log::debug!(
            "context {id} created in slot {} of {}",
            handle.get(),
            registry.capacity()
        );
        Ok(Self {
            id,
            handle: Cell::new(Some(handle)),
            registry,
            config,
            streams: RefCell::new(IndexMap::new()),
            stream_contexts: RefCell::new(IndexMap::new()),
            scheduler: Rc::new(Scheduler::new()),
            next_node: Cell::new(1),
            dispose_hooks: Rc::new(RefCell::new(IndexMap::new())),
        })
    }

    /// The calling thread's default context, created on first access.
    ///
    /// # Errors
    /// [`Error::ContextCapacity`] if it does not exist yet and the default registry is full.
    pub fn instance() -> Result<Rc<Context>> {
        INSTANCE.with(|instance| {
            if let Some(context) = instance.borrow().as_ref() {
                return Ok(Rc::clone(context));
            }
            let context = Rc::new(Context::new()?);
            *instance.borrow_mut() = Some(Rc::clone(&context));
            Ok(context)
        })
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Registry slot, `None` once disposed.
    pub fn handle(&self) -> Option<ContextHandle> {
        self.handle.get()
    }

    pub fn registry(&self) -> &Rc<ContextRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.get().is_none()
    }

    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    /// Replace the clock. Timers already scheduled keep their absolute expiry.
    pub fn set_clock(&self, clock: Rc<dyn Clock>) {
        *self.scheduler.clock.borrow_mut() = clock;
    }

    pub fn now(&self) -> TimePoint {
        self.scheduler.now()
    }

    /// Queue `action` for the deferred flush of the current update.
    pub fn defer(&self, priority: i32, action: impl FnOnce() + 'static) -> bool {
        self.scheduler.defer(priority, action)
    }

    /// Run and clear the deferred queue. Returns the number of actions run.
    pub fn invoke_deferred(&self) -> usize {
        self.scheduler.deferred.invoke()
    }

    /// A fresh id for a derived node connected to this context.
    pub fn register_node(&self) -> u64 {
        let id = self.next_node.get();
        self.next_node.set(id + 1);
        id
    }

    /// Run `hook` when this context is disposed, unless the returned guard is dropped first.
    /// `node` is an id from [`Context::register_node`].
    pub(crate) fn on_dispose(&self, node: u64, hook: impl FnOnce() + 'static) -> DisposeHook {
        self.dispose_hooks
            .borrow_mut()
            .insert(node, Box::new(hook));
        DisposeHook {
            hooks: Rc::downgrade(&self.dispose_hooks),
            node,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::ContextDisposed)
        } else {
            Ok(())
        }
    }

    /// Register the producer for `usage`, seeded with `initial_value`.
    ///
    /// A stream context that was created for `usage` before this call (subscribers arrived
    /// first) is bound to the new stream.
    ///
    /// # Errors
    /// - [`Error::StreamExists`] if `usage` already has a stream.
    /// - [`Error::TypeMismatch`] if `usage` already has a stream context of another type.
    /// - [`Error::ContextDisposed`] after [`Context::dispose`].
    pub fn create_stream<T: Clone + 'static>(
        &self,
        usage: Usage,
        initial_value: T,
    ) -> Result<StreamWriter<T>> {
        self.ensure_live()?;
        if self.streams.borrow().contains_key(&usage) {
            return Err(Error::StreamExists(usage));
        }
        // Every stream gets a stream context so it is advanced even without subscribers.
        let stream_context = self.get_or_create_stream_context::<T>(usage)?;

        let stream = Rc::new(RefCell::new(Stream::with_capacity(
            usage,
            initial_value,
            self.config.initial_stream_capacity,
        )));
        stream_context.set_stream(Rc::downgrade(&stream));
        let writer = StreamWriter::new(usage, Rc::downgrade(&stream));
        self.streams.borrow_mut().insert(usage, stream);
        log::debug!("context {}: stream {usage} created", self.id);
        Ok(writer)
    }

    /// Producer handle of the existing stream for `usage`.
    pub fn stream<T: 'static>(&self, usage: Usage) -> Option<StreamWriter<T>> {
        let stream = self.streams.borrow().get(&usage).cloned()?;
        let stream = stream.downcast::<RefCell<Stream<T>>>().ok()?;
        Some(StreamWriter::new(usage, Rc::downgrade(&stream)))
    }

    /// The stream context for `usage`, created on first use and bound to the usage's stream
    /// if one exists.
    ///
    /// # Errors
    /// - [`Error::TypeMismatch`] if `usage` is bound to another value type.
    /// - [`Error::ContextDisposed`] after [`Context::dispose`].
    pub fn get_or_create_stream_context<T: Clone + 'static>(
        &self,
        usage: Usage,
    ) -> Result<Rc<StreamContext<T>>> {
        self.ensure_live()?;
        let mismatch = || Error::TypeMismatch {
            usage,
            expected: type_name::<T>(),
        };

        let existing = self.stream_contexts.borrow().get(&usage).cloned();
        let stream_context = match existing {
            Some(erased) => erased
                .into_any()
                .downcast::<StreamContext<T>>()
                .map_err(|_| mismatch())?,
            None => {
                let created = Rc::new(StreamContext::<T>::new(
                    usage,
                    self.config.warn_on_leaked_subscriptions,
                ));
                self.stream_contexts
                    .borrow_mut()
                    .insert(usage, created.clone());
                log::debug!("context {}: stream context {usage} created", self.id);
                created
            }
        };

        if !stream_context.has_stream() {
            let stream = self.streams.borrow().get(&usage).cloned();
            if let Some(stream) = stream {
                let stream = stream
                    .downcast::<RefCell<Stream<T>>>()
                    .map_err(|_| mismatch())?;
                stream_context.set_stream(Rc::downgrade(&stream));
            }
        }
        Ok(stream_context)
    }

    /// Number of streams and stream contexts.
    pub fn stream_count(&self) -> usize {
        self.streams.borrow().len()
    }

    pub fn stream_context_count(&self) -> usize {
        self.stream_contexts.borrow().len()
    }

    fn stream_context_at(&self, index: usize) -> Option<Rc<dyn AnyStreamContext>> {
        self.stream_contexts
            .borrow()
            .get_index(index)
            .map(|(_, context)| Rc::clone(context))
    }

    /// Run one frame. A no-op once disposed.
    ///
    /// Stream contexts created while the update runs join from the next update on.
    pub fn update(&self) {
        if self.is_disposed() {
            return;
        }
        let count = self.stream_contexts.borrow().len();
        for index in 0..count {
            if let Some(stream_context) = self.stream_context_at(index) {
                stream_context.process();
            }
        }

        let fired = self.scheduler.timers.fire_expired(self.now());
        let deferred = self.invoke_deferred();

        for index in 0..count {
            if let Some(stream_context) = self.stream_context_at(index) {
                stream_context.advance();
            }
        }
        log::trace!(
            "context {}: updated {count} stream context(s), {fired} timer(s), {deferred} deferred",
            self.id
        );
    }

    /// Release the nodes connected here, dispose every stream context and stream, then free
    /// the registry slot.
    ///
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let hooks: Vec<_> = self
            .dispose_hooks
            .borrow_mut()
            .drain(..)
            .map(|(_, hook)| hook)
            .collect();
        for hook in hooks {
            hook();
        }
        let stream_contexts: Vec<_> = self
            .stream_contexts
            .borrow_mut()
            .drain(..)
            .map(|(_, context)| context)
            .collect();
        for stream_context in &stream_contexts {
            stream_context.dispose();
        }
        self.streams.borrow_mut().clear();
        self.scheduler.timers.clear();
        self.scheduler.deferred.clear();
        self.registry.release(handle, self.id);
        log::debug!("context {} disposed, slot {} released", self.id, handle.get());
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("handle", &self.handle.get())
            .field("streams", &self.stream_count())
            .field("stream_contexts", &self.stream_context_count())
            .finish()
    }
}
