//! Deferred reply broker.
//!
//! The replication engine demands one reply per delivered command before it
//! hands over the next batch, but a forwarded batch can only be answered
//! once every constituent request has settled, which may happen several
//! batches later. The broker closes that gap: the protocol core tags every
//! reply as done or pending, pending callers' handles are parked here, and
//! a later completion releases them all with the same final bytes.
//!
//! Nothing can be transmitted until the hosting server supplies its send
//! path, which happens exactly once at startup. Until then every delivery
//! blocks on a condition variable.

use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex};

use canopy_types::RequestId;
use tracing::{debug, warn};

use crate::service::EngineReply;

/// Transmits final reply bytes to the caller named by a handle.
///
/// The hosting server supplies the implementation: a handle identifies one
/// in-flight caller (a connection, a message context), and `send` must
/// deliver the bytes to exactly that caller. The broker treats `send` as
/// fire-and-forget; delivery failures are the implementation's to report.
pub trait ReplySender: Send + Sync {
    /// Names one caller awaiting a reply.
    type Handle: Send;

    /// Delivers `reply` to the caller behind `handle`.
    fn send(&self, handle: &Self::Handle, reply: &[u8]);
}

/// Parks reply handles for deferred requests and releases them on
/// completion.
pub struct ReplyBroker<S: ReplySender> {
    sender: Mutex<Option<S>>,
    sender_attached: Condvar,
    parked: Mutex<BTreeMap<RequestId, Vec<S::Handle>>>,
}

impl<S: ReplySender> ReplyBroker<S> {
    /// Creates a broker with no send path attached yet.
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
            sender_attached: Condvar::new(),
            parked: Mutex::new(BTreeMap::new()),
        }
    }

    /// Supplies the send path and wakes every blocked delivery.
    ///
    /// Expected exactly once at startup; later calls are ignored with a
    /// warning so the first path stays authoritative.
    pub fn attach_sender(&self, sender: S) {
        let mut slot = self.sender.lock().expect("broker sender lock poisoned");
        if slot.is_some() {
            warn!("reply sender already attached, keeping the first one");
            return;
        }
        *slot = Some(sender);
        self.sender_attached.notify_all();
    }

    /// Routes one engine reply: resolved replies are sent immediately, a
    /// pending reply parks the caller's handle under its request identifier.
    pub fn manage_reply(&self, reply: EngineReply, handle: S::Handle) {
        match reply {
            EngineReply::Done(bytes) => {
                self.with_sender(|sender| sender.send(&handle, &bytes));
            }
            EngineReply::Pending(id) => {
                debug!(request = %id, "parking reply handle");
                let mut parked = self.parked.lock().expect("broker parked lock poisoned");
                parked.entry(id).or_default().push(handle);
            }
        }
    }

    /// Releases every handle parked under `id` with the same final bytes.
    ///
    /// Releasing an identifier nothing waits on is a no-op: redundant
    /// copies of a forwarded batch settle through here more than once.
    pub fn release(&self, id: RequestId, reply: &[u8]) {
        let handles = {
            let mut parked = self.parked.lock().expect("broker parked lock poisoned");
            parked.remove(&id)
        };
        let Some(handles) = handles else {
            debug!(request = %id, "no parked handles for released request");
            return;
        };

        debug!(request = %id, waiters = handles.len(), "releasing deferred replies");
        self.with_sender(|sender| {
            for handle in &handles {
                sender.send(handle, reply);
            }
        });
    }

    /// Returns the number of request identifiers with parked handles.
    pub fn parked_count(&self) -> usize {
        self.parked.lock().expect("broker parked lock poisoned").len()
    }

    /// Blocks until the send path is attached, then runs `f` with it.
    fn with_sender<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let mut slot = self.sender.lock().expect("broker sender lock poisoned");
        loop {
            if let Some(sender) = slot.as_ref() {
                return f(sender);
            }
            slot = self
                .sender_attached
                .wait(slot)
                .expect("broker sender lock poisoned");
        }
    }
}

impl<S: ReplySender> Default for ReplyBroker<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use bytes::Bytes;
    use uuid::Uuid;

    fn rid(n: u128) -> RequestId {
        RequestId::from_uuid(Uuid::from_u128(n))
    }

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<(u64, Vec<u8>)>>>,
    }

    impl RecordingSender {
        fn sent(&self) -> Vec<(u64, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl ReplySender for RecordingSender {
        type Handle = u64;

        fn send(&self, handle: &u64, reply: &[u8]) {
            self.sent.lock().unwrap().push((*handle, reply.to_vec()));
        }
    }

    #[test]
    fn done_replies_pass_straight_through() {
        let broker = ReplyBroker::new();
        let sender = RecordingSender::default();
        let view = sender.clone();
        broker.attach_sender(sender);

        broker.manage_reply(EngineReply::Done(Bytes::from_static(b"now")), 1);

        assert_eq!(view.sent(), vec![(1, b"now".to_vec())]);
        assert_eq!(broker.parked_count(), 0);
    }

    #[test]
    fn release_delivers_identical_bytes_to_every_waiter() {
        let broker = ReplyBroker::new();
        let sender = RecordingSender::default();
        let view = sender.clone();
        broker.attach_sender(sender);

        let id = rid(9);
        broker.manage_reply(EngineReply::Pending(id), 1);
        broker.manage_reply(EngineReply::Pending(id), 2);
        assert_eq!(broker.parked_count(), 1);
        assert!(view.sent().is_empty());

        broker.release(id, b"final");

        assert_eq!(view.sent(), vec![(1, b"final".to_vec()), (2, b"final".to_vec())]);
        assert_eq!(broker.parked_count(), 0);
    }

    #[test]
    fn releasing_an_unknown_id_is_a_noop() {
        let broker = ReplyBroker::new();
        let sender = RecordingSender::default();
        let view = sender.clone();
        broker.attach_sender(sender);

        broker.release(rid(4), b"nobody");

        assert!(view.sent().is_empty());
    }

    #[test]
    fn the_first_attached_sender_stays_authoritative() {
        let broker = ReplyBroker::new();
        let first = RecordingSender::default();
        let second = RecordingSender::default();
        let first_view = first.clone();
        let second_view = second.clone();

        broker.attach_sender(first);
        broker.attach_sender(second);
        broker.manage_reply(EngineReply::Done(Bytes::from_static(b"hi")), 3);

        assert_eq!(first_view.sent(), vec![(3, b"hi".to_vec())]);
        assert!(second_view.sent().is_empty());
    }

    #[test]
    fn deliveries_block_until_the_sender_is_attached() {
        let broker = Arc::new(ReplyBroker::new());
        let sender = RecordingSender::default();
        let view = sender.clone();

        let worker = {
            let broker = Arc::clone(&broker);
            thread::spawn(move || {
                broker.manage_reply(EngineReply::Done(Bytes::from_static(b"late")), 7);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(view.sent().is_empty());

        broker.attach_sender(sender);
        worker.join().unwrap();

        assert_eq!(view.sent(), vec![(7, b"late".to_vec())]);
    }
}
