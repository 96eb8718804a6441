//! Intents consumed by the stream actor

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::Result;
use crate::event::Event;
use crate::stats::StreamStats;
use crate::subscriber::{EventSink, Subscriber};

/// A single intent on the stream's intake queue
///
/// Request/response intents carry a oneshot sender; the caller waits on the
/// paired receiver until the actor has processed the intent.
pub(crate) enum Command {
    Register {
        subscriber: Arc<dyn Subscriber>,
        reply: oneshot::Sender<Result<()>>,
    },
    Deregister {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    Publish(Event),
    Replay(Arc<dyn EventSink>),
    Lookup {
        id: String,
        reply: oneshot::Sender<Option<Arc<dyn Subscriber>>>,
    },
    Stats(oneshot::Sender<StreamStats>),
    Shutdown(oneshot::Sender<()>),
}

impl Command {
    /// Whether processing this intent re-arms the idle deadline
    pub(crate) fn is_activity(&self) -> bool {
        !matches!(self, Command::Lookup { .. } | Command::Stats(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::Deregister { .. } => "deregister",
            Command::Publish(_) => "publish",
            Command::Replay(_) => "replay",
            Command::Lookup { .. } => "lookup",
            Command::Stats(_) => "stats",
            Command::Shutdown(_) => "shutdown",
        }
    }
}
