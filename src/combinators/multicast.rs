//! Lazy, reference-counted upstream connections for derived nodes.
//!
//! A node is connected to its upstream sources the first time something subscribes to it in
//! a given context, and disconnected when the last of those subscriptions is disposed.
//! Subscribers in the same context share one connection (and thus one copy of the node's
//! state); different contexts get independent connections.

use crate::context::{Context, ContextId};
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::observer_list::ObserverList;
use crate::source::InputSource;
use crate::subscription::Subscription;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) struct Multicast<T> {
    kind: &'static str,
    outputs: RefCell<Vec<(ContextId, ObserverList<T>)>>,
}

impl<T: 'static> Multicast<T> {
    pub(crate) fn new(kind: &'static str) -> Rc<Self> {
        Rc::new(Self {
            kind,
            outputs: RefCell::new(Vec::new()),
        })
    }

    /// Add `observer` to the node's output in `context`, connecting the node first if this
    /// is its first subscriber there. `connect` receives the output list and returns the
    /// upstream subscription(s).
    pub(crate) fn subscribe(
        self: &Rc<Self>,
        context: &Context,
        observer: Rc<dyn Observer<T>>,
        connect: impl FnOnce(ObserverList<T>) -> Result<Subscription>,
    ) -> Result<Subscription> {
        let id = context.id();
        let existing = self
            .outputs
            .borrow()
            .iter()
            .find(|(owner, _)| *owner == id)
            .map(|(_, output)| output.clone());
        if let Some(output) = existing {
            return Ok(output.add(observer));
        }

        let output = ObserverList::new();
        let upstream = connect(output.clone())?;
        let node = context.register_node();
        let kind = self.kind;
        log::debug!("{kind} node {node} connected in context {id}");

        let this = Rc::downgrade(self);
        let released = Rc::downgrade(self);
        let hook = context.on_dispose(node, move || {
            if let Some(this) = released.upgrade() {
                this.release(id);
            }
        });
        output.set_teardown(move || {
            drop(hook);
            drop(upstream);
            if let Some(this) = this.upgrade() {
                this.release(id);
            }
            log::debug!("{kind} node {node} disconnected in context {id}");
        });
        self.outputs.borrow_mut().push((id, output.clone()));
        Ok(output.add(observer))
    }

    // The output is dropped outside the borrow.
    fn release(&self, id: ContextId) {
        let position = self.outputs.borrow().iter().position(|(owner, _)| *owner == id);
        if let Some(position) = position {
            let _output = self.outputs.borrow_mut().remove(position);
        }
    }

    /// Number of contexts the node is currently connected in.
    #[cfg(test)]
    pub(crate) fn connections(&self) -> usize {
        self.outputs.borrow().len()
    }
}

/// Receives notifications tagged with the index of the upstream they came from.
pub(crate) trait IndexedObserver<T> {
    fn on_next_at(&self, index: usize, value: &T);

    fn on_completed_at(&self, _index: usize) {}

    fn on_error_at(&self, _index: usize, error: &Error) {
        log::warn!("unhandled pipeline error: {error}");
    }
}

/// Adapts one input of a multi-input node to [`Observer`].
pub(crate) struct Port<N> {
    node: Rc<N>,
    index: usize,
}

impl<T, N: IndexedObserver<T>> Observer<T> for Port<N> {
    fn on_next(&self, value: &T) {
        self.node.on_next_at(self.index, value);
    }

    fn on_completed(&self) {
        self.node.on_completed_at(self.index);
    }

    fn on_error(&self, error: &Error) {
        self.node.on_error_at(self.index, error);
    }
}

/// Subscribe `node` to every source, tagging each with its position.
pub(crate) fn connect_all<T, N>(
    context: &Context,
    sources: &[Rc<dyn InputSource<T>>],
    node: &Rc<N>,
) -> Result<Subscription>
where
    T: 'static,
    N: IndexedObserver<T> + 'static,
{
    let subscriptions = sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let port = Rc::new(Port {
                node: Rc::clone(node),
                index,
            });
            source.subscribe(context, port)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Subscription::all(subscriptions))
}
