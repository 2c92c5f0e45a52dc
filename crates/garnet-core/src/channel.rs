//! Unbuffered rendezvous channel
//!
//! A channel holds at most one in-flight value. `deliver` parks the sender
//! until a receiver has taken its value; `receive` parks until a value is
//! available. Waiting senders and receivers are served in arrival order using
//! ticket counters, so pairing is FIFO on both sides.

use crate::value::Value;
use parking_lot::{Condvar, Mutex};
use std::fmt;

/// One-slot synchronous channel
pub struct ChannelObject {
    /// Internal state protected by a mutex
    inner: Mutex<ChannelInner>,
    /// Senders waiting for their turn, an empty slot, or their value to be taken
    senders: Condvar,
    /// Receivers waiting for their turn or a filled slot
    receivers: Condvar,
}

/// Internal channel state
#[derive(Default)]
struct ChannelInner {
    /// Pending value
    slot: Option<Value>,
    /// Next ticket handed to an arriving sender
    next_sender: u64,
    /// Ticket of the sender currently allowed to fill the slot
    serving_sender: u64,
    /// Next ticket handed to an arriving receiver
    next_receiver: u64,
    /// Ticket of the receiver currently allowed to empty the slot
    serving_receiver: u64,
    /// Number of values taken out of the slot so far
    taken: u64,
}

impl fmt::Debug for ChannelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ChannelObject")
            .field("pending", &inner.slot.is_some())
            .field("waiting_senders", &(inner.next_sender - inner.serving_sender))
            .field(
                "waiting_receivers",
                &(inner.next_receiver - inner.serving_receiver),
            )
            .finish()
    }
}

impl Default for ChannelObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelObject {
    /// Create an empty channel
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ChannelInner::default()),
            senders: Condvar::new(),
            receivers: Condvar::new(),
        }
    }

    /// Hand `value` to a receiver, blocking until one has taken it
    pub fn deliver(&self, value: Value) {
        let mut inner = self.inner.lock();
        let ticket = inner.next_sender;
        inner.next_sender += 1;

        while inner.serving_sender != ticket || inner.slot.is_some() {
            self.senders.wait(&mut inner);
        }

        // `taken` only advances once per filled slot, so it identifies our value
        let sequence = inner.taken;
        inner.slot = Some(value);
        self.receivers.notify_all();

        while inner.taken == sequence {
            self.senders.wait(&mut inner);
        }

        inner.serving_sender += 1;
        self.senders.notify_all();
    }

    /// Take the next delivered value, blocking until a sender provides one
    pub fn receive(&self) -> Value {
        let mut inner = self.inner.lock();
        let ticket = inner.next_receiver;
        inner.next_receiver += 1;

        let value = loop {
            if inner.serving_receiver == ticket {
                if let Some(value) = inner.slot.take() {
                    break value;
                }
            }
            self.receivers.wait(&mut inner);
        };

        inner.serving_receiver += 1;
        inner.taken += 1;
        self.senders.notify_all();
        self.receivers.notify_all();
        value
    }
}
