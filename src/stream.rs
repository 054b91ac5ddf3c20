//! Per-usage value buffers.
//!
//! A [`Stream`] collects the values offered for one [`Usage`] during a frame. Slot 0 always
//! holds the *previous* value (the absolute value carried over from the last frame); the
//! slots after it are the *pending* values offered since the last [`Stream::advance`].
//!
//! ```text
//! [previous | pending 0 | pending 1 | ...]
//!  \_______ as_extended_slice() ______/
//!             \___ as_slice() ____/
//! ```
//!
//! `advance()` moves the last pending value into slot 0 and truncates the buffer without
//! releasing capacity, so a stream that sees a steady rate of samples stops allocating
//! after warm-up.

use crate::usage::Usage;
use std::cell::RefCell;
use std::rc::Weak;

/// Append-style buffer of values for one usage.
#[derive(Clone, Debug)]
pub struct Stream<T> {
    usage: Usage,
    values: Vec<T>,
}

impl<T> Stream<T> {
    /// Create a stream seeded with `initial_value` as its previous value.
    ///
    /// The seed is not pending: `as_slice()` is empty until something is offered.
    pub fn new(usage: Usage, initial_value: T) -> Self {
        Self::with_capacity(usage, initial_value, 1)
    }

    /// Like [`Stream::new`], reserving room for `capacity` pending values.
    pub fn with_capacity(usage: Usage, initial_value: T, capacity: usize) -> Self {
        let mut values = Vec::with_capacity(capacity.saturating_add(1));
        values.push(initial_value);
        Self { usage, values }
    }

    #[inline]
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Append a value.
    #[inline]
    pub fn offer(&mut self, value: T) {
        self.values.push(value);
    }

    /// Append a copy of a borrowed value.
    #[inline]
    pub fn offer_ref(&mut self, value: &T)
    where
        T: Clone,
    {
        self.values.push(value.clone());
    }

    /// Values offered since the last advance.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values[1..]
    }

    /// The previous value followed by the pending values.
    #[inline]
    pub fn as_extended_slice(&self) -> &[T] {
        &self.values
    }

    /// The value carried over from the previous frame.
    #[inline]
    pub fn previous(&self) -> &T {
        &self.values[0]
    }

    /// The most recent value: the last pending value, or the previous one if nothing is pending.
    #[inline]
    pub fn current(&self) -> &T {
        &self.values[self.values.len() - 1]
    }

    /// Number of pending values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.len() == 1
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.capacity() - 1
    }

    /// End the frame: the last pending value (if any) becomes the previous value and the
    /// pending window is cleared.
    pub fn advance(&mut self) {
        let last = self.values.len() - 1;
        if last > 0 {
            self.values.swap(0, last);
            self.values.truncate(1);
        }
    }

    /// End the frame after the first `consumed` pending values were delivered: the last of
    /// them becomes the previous value, the pending values after it stay pending.
    pub fn advance_by(&mut self, consumed: usize) {
        let consumed = consumed.min(self.len());
        if consumed > 0 {
            self.values.drain(..consumed);
        }
    }
}

/// Producer handle for a stream owned by a [`Context`](crate::Context).
///
/// The handle does not keep the stream alive. Offers made after the owning context was
/// disposed are dropped with a warning.
pub struct StreamWriter<T> {
    usage: Usage,
    stream: Weak<RefCell<Stream<T>>>,
}

impl<T> Clone for StreamWriter<T> {
    fn clone(&self) -> Self {
        Self {
            usage: self.usage,
            stream: self.stream.clone(),
        }
    }
}

impl<T> StreamWriter<T> {
    pub(crate) fn new(usage: Usage, stream: Weak<RefCell<Stream<T>>>) -> Self {
        Self { usage, stream }
    }

    #[inline]
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// True while the owning context still holds the stream.
    pub fn is_attached(&self) -> bool {
        self.stream.strong_count() > 0
    }

    /// Offer a value for delivery on the next update.
    pub fn offer(&self, value: T) {
        match self.stream.upgrade() {
            Some(stream) => stream.borrow_mut().offer(value),
            None => self.warn_detached(),
        }
    }

    /// Offer a copy of a borrowed value.
    pub fn offer_ref(&self, value: &T)
    where
        T: Clone,
    {
        match self.stream.upgrade() {
            Some(stream) => stream.borrow_mut().offer_ref(value),
            None => self.warn_detached(),
        }
    }

    /// Run `f` against the underlying stream, `None` once detached.
    pub fn with_stream<R>(&self, f: impl FnOnce(&Stream<T>) -> R) -> Option<R> {
        self.stream.upgrade().map(|stream| f(&stream.borrow()))
    }

    fn warn_detached(&self) {
        log::warn!(
            "offer to stream {} dropped: owning context was disposed",
            self.usage
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGE: Usage = Usage::from_parts(0x05, 0x01);

    #[test]
    fn new_stream_has_no_pending_values() {
        let mut stream = Stream::new(USAGE, 100);
        assert_eq!(stream.as_slice().len(), 0);
        assert_eq!(*stream.previous(), 100);
        assert_eq!(stream.as_extended_slice(), &[100]);

        stream.advance();
        assert_eq!(stream.as_slice().len(), 0);
        assert_eq!(*stream.previous(), 100);
    }

    #[test]
    fn offers_accumulate_until_advance() {
        let mut stream = Stream::new(USAGE, 0);
        for v in 1..=5 {
            stream.offer(v);
        }
        assert_eq!(stream.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(stream.as_extended_slice().len(), 6);
        assert_eq!(*stream.current(), 5);

        stream.advance();
        assert!(stream.is_empty());
        assert_eq!(*stream.previous(), 5);
        assert_eq!(stream.as_extended_slice(), &[5]);
    }

    #[test]
    fn advance_by_keeps_undelivered_values_pending() {
        let mut stream = Stream::new(USAGE, 0);
        for v in 1..=4 {
            stream.offer(v);
        }
        stream.advance_by(2);
        assert_eq!(*stream.previous(), 2);
        assert_eq!(stream.as_slice(), &[3, 4]);

        stream.advance_by(0);
        assert_eq!(stream.as_extended_slice(), &[2, 3, 4]);

        stream.advance_by(10);
        assert_eq!(stream.as_extended_slice(), &[4]);
    }

    #[test]
    fn offer_ref_and_offer_are_equivalent() {
        let mut a = Stream::new(USAGE, String::new());
        let mut b = Stream::new(USAGE, String::new());
        let value = String::from("x");
        a.offer(value.clone());
        b.offer_ref(&value);
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn advance_keeps_capacity() {
        let mut stream = Stream::new(USAGE, 0u8);
        for v in 0..32 {
            stream.offer(v);
        }
        let capacity = stream.capacity();
        stream.advance();
        assert!(stream.capacity() >= capacity);
        for v in 0..32 {
            stream.offer(v);
        }
        assert_eq!(stream.capacity(), capacity);
    }
}
