//! Stream actor: the single writer of stream state
//!
//! One task per stream owns the subscriber list, the event log and the
//! counters. Intents arrive on one bounded queue and are handled one per
//! step, in queue order. A single reusable idle timer is reset after every
//! processed intent except lookups and stats queries.
//!
//! ```text
//! loop {
//!   select! {
//!     command ──► handle_command()
//!     │             ├─► Register    bind link, append (policy check)
//!     │             ├─► Deregister  disconnect_all, remove first match
//!     │             ├─► Publish     log.add (auto-replay), broadcast in order
//!     │             ├─► Replay      log.replay(sink), sink.replay_complete()
//!     │             ├─► Lookup      reply first match
//!     │             ├─► Stats       reply snapshot
//!     │             └─► Shutdown    disconnect all, terminate ──► exit
//!     │           reset idle deadline (not for Lookup/Stats)
//!     │
//!     idle deadline ──► any active subscriber?
//!                         ├─► yes: re-arm
//!                         └─► no:  terminate ──► exit
//!   }
//! }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::log::EventLog;
use crate::stats::StreamStats;
use crate::subscriber::{EventSink, Subscriber};

use super::command::Command;
use super::config::{DuplicatePolicy, StreamConfig};
use super::handle::Stream;
use super::link::StreamLink;
use super::state::StreamState;

/// Outcome of one processing step
enum Step {
    Continue,
    Exit,
}

pub(super) struct StreamActor {
    config: StreamConfig,
    log: Box<dyn EventLog>,
    subscribers: Vec<Arc<dyn Subscriber>>,
    rx: mpsc::Receiver<Command>,
    /// Handle cloned into each subscriber's link
    handle: Stream,
    events_published: u64,
    replays_served: u64,
    started_at: Instant,
}

impl StreamActor {
    pub(super) fn new(
        config: StreamConfig,
        log: Box<dyn EventLog>,
        rx: mpsc::Receiver<Command>,
        handle: Stream,
    ) -> Self {
        Self {
            config,
            log,
            subscribers: Vec::new(),
            rx,
            handle,
            events_published: 0,
            replays_served: 0,
            started_at: Instant::now(),
        }
    }

    pub(super) async fn run(mut self) {
        let max_inactivity = self.config.max_inactivity;
        let idle = time::sleep(max_inactivity);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;

                command = self.rx.recv() => {
                    // The actor holds a sender itself, so the queue only
                    // ends if it was closed from here.
                    let Some(command) = command else { break };

                    // Read-only queries do not count as activity
                    let is_activity = command.is_activity();
                    if let Step::Exit = self.handle_command(command) {
                        return;
                    }
                    if is_activity {
                        idle.as_mut().reset(Instant::now() + max_inactivity);
                    }
                }
                () = &mut idle => {
                    if self.has_active_subscribers() {
                        idle.as_mut().reset(Instant::now() + max_inactivity);
                        continue;
                    }

                    tracing::info!(
                        stream = %self.config.name,
                        idle_ms = max_inactivity.as_millis() as u64,
                        subscribers = self.subscribers.len(),
                        "No active subscribers, closing idle stream"
                    );
                    self.terminate();
                    return;
                }
            }
        }

        self.terminate();
    }

    fn handle_command(&mut self, command: Command) -> Step {
        tracing::trace!(stream = %self.config.name, command = command.kind(), "Processing");

        match command {
            Command::Register { subscriber, reply } => {
                let _ = reply.send(self.add_subscriber(subscriber));
            }
            Command::Deregister { id, reply } => {
                let _ = reply.send(self.remove_subscriber(&id));
            }
            Command::Publish(event) => self.publish(event),
            Command::Replay(sink) => self.replay(sink.as_ref()),
            Command::Lookup { id, reply } => {
                let found = self.subscriber_index(&id).map(|i| self.subscribers[i].clone());
                let _ = reply.send(found);
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Command::Shutdown(reply) => {
                self.remove_all_subscribers();
                self.terminate();
                let _ = reply.send(());
                return Step::Exit;
            }
        }

        Step::Continue
    }

    fn add_subscriber(&mut self, subscriber: Arc<dyn Subscriber>) -> Result<()> {
        let id = subscriber.id().to_owned();

        if self.config.duplicate_policy == DuplicatePolicy::Reject
            && self.subscriber_index(&id).is_some()
        {
            tracing::warn!(stream = %self.config.name, subscriber = %id, "Duplicate subscriber rejected");
            return Err(Error::DuplicateSubscriber(id));
        }

        subscriber.bind(StreamLink::new(
            self.handle.clone(),
            id.clone(),
            self.config.auto_replay,
        ));
        self.subscribers.push(subscriber);

        tracing::debug!(
            stream = %self.config.name,
            subscriber = %id,
            subscribers = self.subscribers.len(),
            "Subscriber added"
        );

        Ok(())
    }

    fn remove_subscriber(&mut self, id: &str) -> bool {
        let Some(index) = self.subscriber_index(id) else {
            return false;
        };

        let subscriber = self.subscribers.remove(index);
        subscriber.disconnect_all();

        tracing::debug!(
            stream = %self.config.name,
            subscriber = %id,
            subscribers = self.subscribers.len(),
            "Subscriber removed"
        );

        true
    }

    fn remove_all_subscribers(&mut self) {
        for subscriber in self.subscribers.drain(..) {
            subscriber.disconnect_all();
        }
    }

    fn subscriber_index(&self, id: &str) -> Option<usize> {
        self.subscribers.iter().position(|s| s.id() == id)
    }

    fn has_active_subscribers(&self) -> bool {
        self.subscribers.iter().any(|s| s.has_connections())
    }

    fn publish(&mut self, event: Event) {
        // Log first so replay and live traffic share one total order
        let event = if self.config.auto_replay {
            self.log.add(event)
        } else {
            event
        };
        self.events_published += 1;

        for subscriber in &self.subscribers {
            subscriber.broadcast(&event);
        }
    }

    fn replay(&mut self, sink: &dyn EventSink) {
        let delivered = self.log.replay(sink);
        sink.replay_complete();
        self.replays_served += 1;

        let logged = self.log.len();
        if delivered < logged {
            tracing::warn!(
                stream = %self.config.name,
                delivered = delivered,
                logged = logged,
                "Replay sink refused part of the history"
            );
        }

        tracing::debug!(
            stream = %self.config.name,
            delivered = delivered,
            logged = self.log.len(),
            "History replayed"
        );
    }

    fn stats(&self) -> StreamStats {
        StreamStats {
            name: self.config.name.clone(),
            state: StreamState::Active,
            subscriber_count: self.subscribers.len(),
            active_subscriber_count: self
                .subscribers
                .iter()
                .filter(|s| s.has_connections())
                .count(),
            log_len: self.log.len(),
            events_published: self.events_published,
            replays_served: self.replays_served,
            uptime: self.started_at.elapsed(),
        }
    }

    /// Enter the terminal state and stop accepting intents
    ///
    /// Intents still queued are dropped with the receiver; their callers
    /// observe `Error::StreamClosed`.
    fn terminate(&mut self) {
        self.handle.shared().set_closed();
        self.rx.close();

        tracing::info!(
            stream = %self.config.name,
            events_published = self.events_published,
            "Stream closed"
        );
    }
}
