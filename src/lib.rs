//! Single-stream publish/subscribe broadcast actor
//!
//! A [`Stream`] accepts published [`Event`]s and fans them out to every
//! registered [`Subscriber`]. With auto-replay enabled, events are appended
//! to an [`EventLog`] and replayed to connections that join late. A stream
//! closes itself once it has been idle with no active subscribers for
//! `max_inactivity`, or when [`Stream::close`] is called.
//!
//! All stream state is owned by a single tokio task and changed only through
//! its intake queue, so membership needs no locks.

pub mod error;
pub mod event;
pub mod log;
pub mod stats;
pub mod stream;
pub mod subscriber;

pub use error::{Error, Result};
pub use event::Event;
pub use log::{EventLog, MemoryEventLog};
pub use stats::StreamStats;
pub use stream::{DuplicatePolicy, Stream, StreamConfig, StreamLink, StreamState};
pub use subscriber::{
    ChannelSubscriber, Connection, EventReceiver, EventSink, Subscriber, SubscriberConfig,
};
