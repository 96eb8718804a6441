//! Broadcast stream actor
//!
//! A stream fans published events out to a dynamic set of subscribers,
//! optionally replays its history to late joiners, and closes itself after a
//! period of inactivity with nobody connected, or on explicit shutdown.
//!
//! # Architecture
//!
//! ```text
//!     Stream (handle)      Stream (handle)      StreamLink (per subscriber)
//!          │                    │                    │
//!          │  publish/register  │  close/lookup      │  deregister/replay
//!          └────────────────────┼────────────────────┘
//!                               ▼
//!                  mpsc::Sender<Command> (bounded)
//!                               │
//!                               ▼
//!                  ┌─────────────────────────┐
//!                  │ StreamActor (one task)  │
//!                  │   subscribers: Vec<..>  │
//!                  │   log: Box<EventLog>    │
//!                  │   idle timer            │
//!                  └────────────┬────────────┘
//!                               │ broadcast(&Event), in membership order
//!              ┌────────────────┼────────────────┐
//!              ▼                ▼                ▼
//!         Subscriber       Subscriber       Subscriber
//! ```
//!
//! No lock guards the subscriber list: only the actor task ever touches it.
//! Reads such as [`Stream::lookup_subscriber`] are request/response
//! exchanges with the actor.

mod actor;
mod command;
pub mod config;
pub mod handle;
pub mod link;
pub mod state;

pub use config::{
    DuplicatePolicy, StreamConfig, DEFAULT_INTAKE_BUFFER_SIZE, DEFAULT_MAX_INACTIVITY,
};
pub use handle::Stream;
pub use link::StreamLink;
pub use state::StreamState;
