//! Public handle to a running stream

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::log::{EventLog, MemoryEventLog};
use crate::stats::StreamStats;
use crate::subscriber::{EventSink, Subscriber};

use super::actor::StreamActor;
use super::command::Command;
use super::config::StreamConfig;
use super::state::{SharedState, StreamState};

/// Handle to a broadcast stream
///
/// Cheap to clone; every clone talks to the same actor task. All intents go
/// through one bounded queue and are processed in the order they were
/// enqueued.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
///
/// use broadcast_rs::{ChannelSubscriber, Event, Stream, StreamConfig};
///
/// # async fn example() -> broadcast_rs::Result<()> {
/// let stream = Stream::new(StreamConfig::default().name("news"));
///
/// let alice = Arc::new(ChannelSubscriber::new("alice"));
/// stream.add_subscriber(alice.clone()).await?;
/// let mut rx = alice.connect().await?;
///
/// stream.publish(Event::new("hello")).await?;
/// let event = rx.recv().await;
///
/// stream.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Stream {
    name: Arc<str>,
    tx: mpsc::Sender<Command>,
    shared: Arc<SharedState>,
}

impl Stream {
    /// Start a stream backed by an unbounded in-memory log
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: StreamConfig) -> Self {
        Self::with_log(config, MemoryEventLog::new())
    }

    /// Start a stream backed by a custom event log
    pub fn with_log<L: EventLog>(config: StreamConfig, log: L) -> Self {
        let (tx, rx) = mpsc::channel(config.intake_buffer_size.max(1));
        let stream = Self {
            name: Arc::from(config.name.as_str()),
            tx,
            shared: Arc::new(SharedState::new()),
        };

        tracing::info!(
            stream = %stream.name,
            auto_replay = config.auto_replay,
            max_inactivity_ms = config.max_inactivity.as_millis() as u64,
            "Stream started"
        );

        let actor = StreamActor::new(config, Box::new(log), rx, stream.clone());
        tokio::spawn(actor.run());

        stream
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a subscriber
    ///
    /// Waits until the actor has processed the registration.
    pub async fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Register { subscriber, reply }).await?;
        rx.await?
    }

    /// Remove the first subscriber registered under `id`
    ///
    /// Returns whether a subscriber was removed.
    pub async fn remove_subscriber(&self, id: &str) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Deregister {
                id: id.to_owned(),
                reply,
            })
            .await?;
        Ok(rx.await?)
    }

    /// Publish an event to every subscriber
    ///
    /// Waits only while the intake queue is full.
    pub async fn publish(&self, event: Event) -> Result<()> {
        self.tx.send(Command::Publish(event)).await?;
        Ok(())
    }

    /// Publish without waiting for intake capacity
    pub fn try_publish(&self, event: Event) -> Result<()> {
        self.tx
            .try_send(Command::Publish(event))
            .map_err(|e| match e {
                TrySendError::Full(_) => Error::IntakeFull,
                TrySendError::Closed(_) => Error::StreamClosed,
            })
    }

    /// Replay the stream's history into `sink`
    pub async fn request_replay(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        self.tx.send(Command::Replay(sink)).await?;
        Ok(())
    }

    /// Find the first subscriber registered under `id`
    pub async fn lookup_subscriber(&self, id: &str) -> Result<Option<Arc<dyn Subscriber>>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Lookup {
                id: id.to_owned(),
                reply,
            })
            .await?;
        Ok(rx.await?)
    }

    /// Get a statistics snapshot
    pub async fn stats(&self) -> Result<StreamStats> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Stats(reply)).await?;
        Ok(rx.await?)
    }

    /// Shut the stream down, disconnecting every subscriber
    ///
    /// Only the first call sends the shutdown; later or concurrent calls
    /// wait for the stream to finish closing. Closing a stream that already
    /// exited on its own is a no-op.
    ///
    /// Cancel safe: intake capacity is reserved before the shutdown guard is
    /// taken, so dropping this future while it waits leaves the guard free.
    pub async fn close(&self) {
        let Ok(permit) = self.tx.reserve().await else {
            return;
        };

        if !self.shared.request_shutdown() {
            drop(permit);
            self.closed().await;
            return;
        }

        let (reply, rx) = oneshot::channel();
        permit.send(Command::Shutdown(reply));
        let _ = rx.await;
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Check if the stream has closed
    pub fn is_closed(&self) -> bool {
        self.state() == StreamState::Closed
    }

    /// Wait until the stream has closed
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub(crate) fn shared(&self) -> &SharedState {
        &self.shared
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
