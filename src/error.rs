//! Crate error type.
//!
//! All failures are local and synchronous: an operation either succeeds or tells the
//! caller what it did wrong. There is no retry layer and nothing is queued across frames.
//!
//! The variants fall into three groups:
//! - **capacity** ([`Error::ContextCapacity`], [`Error::StreamExists`]): the attempted
//!   operation is refused, the rest of the pipeline keeps running;
//! - **consistency** (everything that signals a caller bug, such as removing an observer
//!   twice or binding one usage to two value types);
//! - **configuration** (I/O and parse errors while loading a [`ContextConfig`](crate::ContextConfig)).

use crate::observer_list::ObserverId;
use crate::usage::Usage;

/// Errors reported by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every slot of the context registry is taken.
    #[error("maximum number of concurrently live contexts reached ({max}); did you forget to dispose previous contexts?")]
    ContextCapacity { max: usize },

    /// The context was disposed and no longer accepts streams or subscriptions.
    #[error("context has been disposed")]
    ContextDisposed,

    /// `create_stream` was called twice for the same usage.
    #[error("a stream already exists for usage {0}")]
    StreamExists(Usage),

    /// The usage is already bound to a stream or stream context of another value type.
    #[error("usage {usage} is bound to a value type other than `{expected}`")]
    TypeMismatch { usage: Usage, expected: &'static str },

    /// An observer was removed from a list it is not registered with (double unsubscribe).
    #[error("observer {0} is not registered with this observer list")]
    ObserverNotRegistered(ObserverId),

    /// An observer was removed from an already empty list.
    #[error("cannot remove an observer from an empty observer list")]
    ObserverListEmpty,

    /// A callback registration without a function.
    #[error("callback has no function")]
    InvalidCallback,

    /// A value does not fit the bit allocation of an endpoint field.
    #[error("endpoint field `{field}` value {value} does not fit in {bits} bits")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
