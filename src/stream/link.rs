//! Back-references handed to subscribers at registration

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::subscriber::EventSink;

use super::handle::Stream;

/// A subscriber's way back into the stream it is registered on
///
/// Carries the deregister sink always, and the replay sink only when the
/// stream has auto-replay enabled.
#[derive(Clone, Debug)]
pub struct StreamLink {
    stream: Stream,
    subscriber_id: String,
    replay: bool,
}

impl StreamLink {
    pub(crate) fn new(stream: Stream, subscriber_id: String, replay: bool) -> Self {
        Self {
            stream,
            subscriber_id,
            replay,
        }
    }

    /// Name of the stream
    pub fn stream_name(&self) -> &str {
        self.stream.name()
    }

    /// Whether the replay sink is wired
    pub fn replay_enabled(&self) -> bool {
        self.replay
    }

    /// Remove this subscriber from the stream
    pub async fn deregister(&self) -> Result<bool> {
        self.stream.remove_subscriber(&self.subscriber_id).await
    }

    /// Ask the stream to replay its history into `sink`
    pub async fn request_replay(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        if !self.replay {
            return Err(Error::ReplayDisabled);
        }
        self.stream.request_replay(sink).await
    }
}
