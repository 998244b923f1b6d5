use std::collections::BTreeMap;
use std::sync::mpsc::{sync_channel, Receiver, RecvError, SyncSender};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Error raised when sending on a [`Broadcaster`] that has been closed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("broadcast: send after close")]
pub struct BroadcastError;

struct Inner<T> {
    listeners: BTreeMap<u64, SyncSender<T>>,
    next_id: u64,
    closed: bool,
}

/// Multi-listener broadcast channel: every listener subscribed at the moment
/// of a [`Broadcaster::send`] receives the value exactly once.
///
/// A single mutex guards both the listener set and the send path, so a slow
/// listener's back-pressure is visible to `send` itself (it returns only
/// once every listener has accepted the value) and structural changes
/// (subscribe/close) cannot interleave with an in-flight send.
pub struct Broadcaster<T> {
    capacity: usize,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Broadcaster<T> {
    /// `capacity` is the per-listener buffer size; 0 means an unbuffered,
    /// synchronous handoff (`send` blocks until the listener reads).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Arc::new(Mutex::new(Inner {
                listeners: BTreeMap::new(),
                next_id: 0,
                closed: false,
            })),
        }
    }

    pub fn subscribe(&self) -> Listener<T> {
        let mut inner = self.inner.lock().expect("broadcaster mutex poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        let (tx, rx) = sync_channel(self.capacity);
        if inner.closed {
            // Drop `tx` immediately: the receiver observes end-of-stream on
            // its very first recv, same as a closed listener.
            drop(tx);
        } else {
            inner.listeners.insert(id, tx);
        }
        Listener {
            id,
            receiver: rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Deliver `v` to every listener currently subscribed, blocking until
    /// each has accepted it. Fails if the broadcaster has been closed.
    pub fn send(&self, v: T) -> Result<(), BroadcastError>
    where
        T: Clone,
    {
        let inner = self.inner.lock().expect("broadcaster mutex poisoned");
        if inner.closed {
            return Err(BroadcastError);
        }
        for tx in inner.listeners.values() {
            // A listener that dropped its receiver without unsubscribing is
            // simply not delivered to; it is reaped on the next `close()` or
            // left dangling, mirroring the original's unbounded `chan<-` map.
            let _ = tx.send(v.clone());
        }
        Ok(())
    }

    /// Mark the broadcaster closed and close every listener's channel.
    /// Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("broadcaster mutex poisoned");
        inner.closed = true;
        inner.listeners.clear();
    }
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A subscription handle returned by [`Broadcaster::subscribe`].
pub struct Listener<T> {
    id: u64,
    receiver: Receiver<T>,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Listener<T> {
    /// Block for the next broadcast value, or `Err` once the broadcaster (or
    /// this listener) has been closed.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.receiver.recv()
    }

    /// Remove this listener from the broadcaster. Its channel stops being
    /// fed; any value still buffered can still be drained.
    pub fn unsubscribe(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn subscriber_receives_sent_value() {
        let b = Broadcaster::new(1);
        let l = b.subscribe();
        b.send(42).unwrap();
        assert_eq!(l.recv().unwrap(), 42);
    }

    #[test]
    fn every_current_listener_receives_once() {
        let b = Broadcaster::new(1);
        let l1 = b.subscribe();
        let l2 = b.subscribe();
        b.send("hi").unwrap();
        assert_eq!(l1.recv().unwrap(), "hi");
        assert_eq!(l2.recv().unwrap(), "hi");
    }

    #[test]
    fn send_after_close_fails() {
        let b: Broadcaster<i32> = Broadcaster::new(0);
        b.close();
        assert_eq!(b.send(1), Err(BroadcastError));
    }

    #[test]
    fn listener_subscribed_after_close_is_already_ended() {
        let b: Broadcaster<i32> = Broadcaster::new(0);
        b.close();
        let l = b.subscribe();
        assert!(l.recv().is_err());
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let b = Broadcaster::new(1);
        let l = b.subscribe();
        l.unsubscribe();
        b.send(1).unwrap();
        // The listener was removed before the send; its channel was never
        // fed, so a non-blocking read sees nothing queued.
        assert!(l.receiver.try_recv().is_err());
    }

    #[test]
    fn unbuffered_send_waits_for_receiver() {
        let b = Arc::new(Broadcaster::new(0));
        let l = b.subscribe();
        let sender = Arc::clone(&b);
        let handle = thread::spawn(move || sender.send(7).unwrap());
        assert_eq!(l.recv().unwrap(), 7);
        handle.join().unwrap();
    }
}
