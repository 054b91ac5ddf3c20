//! Disposable links between an observer and a producer.

use crate::error::Result;
use std::fmt;

type DisposeFn = Box<dyn FnOnce() -> Result<()>>;

/// A live observer ↔ producer link.
///
/// Disposing removes the observer from its producer. `dispose` is idempotent: the second
/// call is a no-op. Dropping a subscription that is still live disposes it, and any error
/// is logged.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<DisposeFn>,
}

impl Subscription {
    /// A subscription that runs `dispose` exactly once.
    pub fn new(dispose: impl FnOnce() -> Result<()> + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to undo.
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    /// Bundle several subscriptions into one.
    ///
    /// Members are disposed in order; every member is disposed even if an earlier one fails,
    /// and the first error is returned.
    pub fn all(members: Vec<Subscription>) -> Self {
        Self::new(move || {
            let mut first_err = None;
            for mut member in members {
                if let Err(err) = member.dispose() {
                    first_err.get_or_insert(err);
                }
            }
            first_err.map_or(Ok(()), Err)
        })
    }

    /// True until disposed.
    pub fn is_live(&self) -> bool {
        self.dispose.is_some()
    }

    /// Remove the link.
    pub fn dispose(&mut self) -> Result<()> {
        match self.dispose.take() {
            Some(dispose) => dispose(),
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            log::error!("failed to dispose subscription: {err}");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn dispose_runs_once() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let mut sub = Subscription::new(move || {
            c.set(c.get() + 1);
            Ok(())
        });
        sub.dispose().unwrap();
        sub.dispose().unwrap();
        drop(sub);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_disposes() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        drop(Subscription::new(move || {
            c.set(c.get() + 1);
            Ok(())
        }));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn all_disposes_every_member_and_reports_first_error() {
        let count = Rc::new(Cell::new(0));
        let members = (0..3)
            .map(|i| {
                let c = count.clone();
                Subscription::new(move || {
                    c.set(c.get() + 1);
                    if i == 1 {
                        Err(Error::ObserverListEmpty)
                    } else {
                        Ok(())
                    }
                })
            })
            .collect();
        let mut all = Subscription::all(members);
        assert!(matches!(all.dispose(), Err(Error::ObserverListEmpty)));
        assert_eq!(count.get(), 3);
    }
}
