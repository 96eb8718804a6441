//! Single client delivery channel
//!
//! Live events travel through a bounded `mpsc` queue. Replayed history
//! instead lands in a staging backlog that has no capacity limit, because it
//! is pushed in one stream step and the client gets no chance to drain in
//! between. The receiver drains the backlog before the queue. Live events
//! that arrive while the backlog is non-empty are staged behind it (bounded
//! by the connection capacity), so order is history first, then live.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, Notify};

use crate::event::Event;

use super::EventSink;

#[derive(Debug, Default)]
struct Staged {
    events: VecDeque<Event>,
    /// Replayed events still at the front of `events`
    history: usize,
    /// Live events queued behind the history
    live: usize,
}

impl Staged {
    fn pop(&mut self) -> Option<Event> {
        let event = self.events.pop_front()?;
        if self.history > 0 {
            self.history -= 1;
        } else {
            self.live = self.live.saturating_sub(1);
        }
        Some(event)
    }
}

/// Staging area shared by a connection and its receiver
#[derive(Debug, Default)]
struct Backlog {
    staged: Mutex<Staged>,
    notify: Notify,
}

impl Backlog {
    fn lock(&self) -> MutexGuard<'_, Staged> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop(&self) -> Option<Event> {
        self.lock().pop()
    }
}

/// Receiving half handed to the client task
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
    backlog: Arc<Backlog>,
}

impl EventReceiver {
    /// Receive the next event, or `None` once the connection is closed and
    /// everything has been drained
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.backlog.pop() {
                return Some(event);
            }

            tokio::select! {
                biased;

                event = self.rx.recv() => {
                    return match event {
                        Some(event) => Some(event),
                        // Staged events may have landed just before close
                        None => self.backlog.pop(),
                    };
                }
                () = self.backlog.notify.notified() => {}
            }
        }
    }

    /// Receive without waiting
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        match self.backlog.pop() {
            Some(event) => Ok(event),
            None => self.rx.try_recv(),
        }
    }
}

struct ConnectionInner {
    id: u64,
    capacity: usize,
    tx: mpsc::Sender<Event>,
    backlog: Arc<Backlog>,
    /// Live connections receive broadcasts; pending ones wait for replay
    live: AtomicBool,
    closed: AtomicBool,
    dropped: AtomicU64,
}

/// One delivery channel to a client
///
/// Pushing never blocks. When the client falls behind on live traffic and
/// its buffer is full, the event is dropped and counted. Replayed history
/// is never dropped.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Create a live connection with the given buffer capacity
    pub fn new(id: u64, capacity: usize) -> (Self, EventReceiver) {
        Self::build(id, capacity, true)
    }

    /// Create a connection that ignores broadcasts until its replay completes
    pub fn pending(id: u64, capacity: usize) -> (Self, EventReceiver) {
        Self::build(id, capacity, false)
    }

    fn build(id: u64, capacity: usize, live: bool) -> (Self, EventReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let backlog = Arc::new(Backlog::default());
        let inner = ConnectionInner {
            id,
            capacity,
            tx,
            backlog: backlog.clone(),
            live: AtomicBool::new(live),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            EventReceiver { rx, backlog },
        )
    }

    /// Connection ID (unique within its subscriber)
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether broadcasts are delivered to this connection
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Whether the connection can still deliver (not closed, receiver alive)
    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire) && !self.inner.tx.is_closed()
    }

    /// Number of events dropped because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Deliver a live broadcast (skipped while replay is pending)
    pub fn deliver(&self, event: &Event) -> bool {
        self.is_live() && self.send_event(event)
    }

    /// Stop accepting events
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.backlog.notify.notify_one();
    }

    fn record_drop(&self) -> bool {
        let dropped = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(
            connection = self.inner.id,
            dropped = dropped,
            "Connection buffer full, event dropped"
        );
        false
    }
}

impl EventSink for Connection {
    fn send_event(&self, event: &Event) -> bool {
        if !self.is_open() {
            return false;
        }

        // Held across try_send so the receiver never sees the queue ahead
        // of staged events
        let mut staged = self.inner.backlog.lock();

        if !self.is_live() {
            staged.events.push_back(event.clone());
            staged.history += 1;
            drop(staged);
            self.inner.backlog.notify.notify_one();
            return true;
        }

        if !staged.events.is_empty() {
            if staged.live >= self.inner.capacity {
                return self.record_drop();
            }
            staged.events.push_back(event.clone());
            staged.live += 1;
            drop(staged);
            self.inner.backlog.notify.notify_one();
            return true;
        }

        match self.inner.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => self.record_drop(),
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn replay_complete(&self) {
        self.inner.live.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("live", &self.is_live())
            .field("open", &self.is_open())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver() {
        let (conn, mut rx) = Connection::new(1, 4);

        assert!(conn.deliver(&Event::new("a")));
        assert_eq!(rx.recv().await.unwrap().data, "a");
    }

    #[tokio::test]
    async fn test_full_buffer_drops() {
        let (conn, mut rx) = Connection::new(1, 2);

        assert!(conn.deliver(&Event::new("a")));
        assert!(conn.deliver(&Event::new("b")));
        assert!(!conn.deliver(&Event::new("c")));
        assert_eq!(conn.dropped(), 1);

        assert_eq!(rx.recv().await.unwrap().data, "a");
        assert_eq!(rx.recv().await.unwrap().data, "b");
    }

    #[test]
    fn test_pending_until_replay_complete() {
        let (conn, mut rx) = Connection::pending(1, 4);

        assert!(!conn.deliver(&Event::new("live")));
        assert!(conn.send_event(&Event::new("history")));
        conn.replay_complete();
        assert!(conn.deliver(&Event::new("live")));

        assert_eq!(rx.try_recv().unwrap().data, "history");
        assert_eq!(rx.try_recv().unwrap().data, "live");
    }

    #[tokio::test]
    async fn test_history_larger_than_buffer_is_kept() {
        let (conn, mut rx) = Connection::pending(1, 2);

        for i in 0..10 {
            assert!(conn.send_event(&Event::new(i.to_string())));
        }
        conn.replay_complete();
        assert!(conn.deliver(&Event::new("live")));

        for i in 0..10 {
            assert_eq!(rx.recv().await.unwrap().data, i.to_string());
        }
        assert_eq!(rx.recv().await.unwrap().data, "live");
        assert_eq!(conn.dropped(), 0);
    }

    #[tokio::test]
    async fn test_live_behind_history_is_bounded() {
        let (conn, mut rx) = Connection::pending(1, 2);

        assert!(conn.send_event(&Event::new("h")));
        conn.replay_complete();

        assert!(conn.deliver(&Event::new("l1")));
        assert!(conn.deliver(&Event::new("l2")));
        assert!(!conn.deliver(&Event::new("l3")));
        assert_eq!(conn.dropped(), 1);

        assert_eq!(rx.recv().await.unwrap().data, "h");
        assert_eq!(rx.recv().await.unwrap().data, "l1");
        assert_eq!(rx.recv().await.unwrap().data, "l2");

        // Backlog drained, so live traffic goes through the queue again
        assert!(conn.deliver(&Event::new("l4")));
        assert_eq!(rx.recv().await.unwrap().data, "l4");
    }

    #[tokio::test]
    async fn test_recv_wakes_on_staged_history() {
        let (conn, mut rx) = Connection::pending(1, 4);

        let reader = tokio::spawn(async move { rx.recv().await.map(|e| e.data) });
        tokio::task::yield_now().await;

        conn.send_event(&Event::new("late history"));
        conn.replay_complete();

        let received = reader.await.unwrap();
        assert_eq!(received.unwrap(), "late history");
    }

    #[test]
    fn test_close() {
        let (conn, rx) = Connection::new(1, 4);
        assert!(conn.is_open());

        conn.close();
        assert!(!conn.is_open());
        assert!(!conn.send_event(&Event::new("a")));

        let (conn, rx2) = Connection::new(2, 4);
        drop(rx2);
        assert!(!conn.is_open());
        drop(rx);
    }
}
