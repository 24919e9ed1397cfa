//! Engine-facing service adapter.
//!
//! The replication engine hands every replica the same ordered stream of
//! opaque command batches. [`ReplicaService`] is the deterministic state
//! machine behind that stream: it decodes each command, runs the batch
//! through the protocol core, publishes settled deferred replies through
//! the reply broker, and hands the engine back one tagged reply per
//! command.
//!
//! Undecodable commands degrade into an invalid-payload reply in their
//! batch position; they never fault the replica.

use std::sync::Arc;

use bytes::Bytes;
use canopy_topology::Topology;
use canopy_types::{GroupId, RequestId};
use canopy_wire::{GroupTransport, Outcome, Reply, Response, decode_request};
use tracing::{debug, error, warn};

use crate::broker::{ReplyBroker, ReplySender};
use crate::config::ReplicaConfig;
use crate::error::{ReplicaError, Result};
use crate::handler::{RequestHandler, encode_done};
use crate::ledger::ReplicaLedger;

// ============================================================================
// EngineReply
// ============================================================================

/// What the engine should do with one executed command.
///
/// This value stays in process; only the payload bytes inside `Done` ever
/// travel over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineReply {
    /// The command settled: send these reply bytes to the submitter.
    Done(Bytes),

    /// The command is deferred under this identifier; the reply arrives
    /// through the broker once a later batch settles it.
    Pending(RequestId),
}

// ============================================================================
// OrderedService
// ============================================================================

/// The contract a replication engine drives.
///
/// `execute_batch` must be called with every ordered batch, in order, on
/// every replica. Snapshots capture exactly the state those calls mutate,
/// so a replica restored from one continues bit-for-bit.
pub trait OrderedService {
    /// Executes one ordered batch, returning a reply per command in input
    /// order.
    fn execute_batch(&mut self, commands: &[Bytes]) -> Vec<EngineReply>;

    /// Executes a command outside the ordered stream.
    fn execute_unordered(&mut self, command: &[u8]) -> EngineReply;

    /// Serializes the replicated state.
    fn snapshot(&self) -> Result<Vec<u8>>;

    /// Replaces the replicated state with a previously captured snapshot.
    fn install_snapshot(&mut self, snapshot: &[u8]) -> Result<()>;
}

// ============================================================================
// ReplicaService
// ============================================================================

/// One group replica's ordered service: protocol core, settlement ledger,
/// and the broker that delivers deferred replies.
pub struct ReplicaService<T, S: ReplySender> {
    handler: RequestHandler<T>,
    ledger: ReplicaLedger,
    broker: Arc<ReplyBroker<S>>,
}

impl<T: GroupTransport, S: ReplySender> ReplicaService<T, S> {
    /// Assembles the service for one replica of `group`.
    pub fn new(
        group: GroupId,
        topology: Arc<Topology>,
        transport: Arc<T>,
        config: ReplicaConfig,
    ) -> Self {
        Self {
            handler: RequestHandler::new(group, topology, transport, config),
            ledger: ReplicaLedger::new(&config),
            broker: Arc::new(ReplyBroker::new()),
        }
    }

    /// Returns the group this replica serves.
    pub fn group(&self) -> GroupId {
        self.handler.group()
    }

    /// Returns the broker connections park deferred replies with.
    pub fn broker(&self) -> &Arc<ReplyBroker<S>> {
        &self.broker
    }

    /// Read access to the settlement ledger.
    pub fn ledger(&self) -> &ReplicaLedger {
        &self.ledger
    }
}

impl<T: GroupTransport, S: ReplySender> OrderedService for ReplicaService<T, S> {
    fn execute_batch(&mut self, commands: &[Bytes]) -> Vec<EngineReply> {
        debug!(group = %self.group(), commands = commands.len(), "executing ordered batch");

        let mut decoded = Vec::with_capacity(commands.len());
        let mut shapes = Vec::with_capacity(commands.len());
        for command in commands {
            match decode_request(command) {
                Ok(request) => {
                    shapes.push(true);
                    decoded.push(request);
                }
                Err(err) => {
                    warn!(error = %err, "undecodable command in ordered batch");
                    shapes.push(false);
                }
            }
        }

        let output = self.handler.handle_batch(&mut self.ledger, decoded);
        for (id, bytes) in &output.completions {
            self.broker.release(*id, bytes);
        }

        // Re-inflate to input shape: decoded commands take the handler's
        // replies positionally, undecodable ones their degraded marker.
        let mut settled = output.replies.into_iter();
        shapes
            .into_iter()
            .map(|well_formed| {
                if well_formed {
                    settled.next().unwrap_or_else(|| {
                        error!("protocol core returned too few replies");
                        error_reply(Outcome::InternalError)
                    })
                } else {
                    error_reply(Outcome::InvalidPayload)
                }
            })
            .collect()
    }

    fn execute_unordered(&mut self, command: &[u8]) -> EngineReply {
        debug!(len = command.len(), "rejecting unordered command");
        error_reply(Outcome::Unsupported)
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(&self.ledger).map_err(ReplicaError::Snapshot)
    }

    fn install_snapshot(&mut self, snapshot: &[u8]) -> Result<()> {
        self.ledger = postcard::from_bytes(snapshot).map_err(ReplicaError::Snapshot)?;
        Ok(())
    }
}

/// A terminal single-response reply carrying only an outcome.
fn error_reply(outcome: Outcome) -> EngineReply {
    encode_done(&Reply::Single(Response::new(outcome)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use canopy_wire::{
        ClientRequest, ForwardedBatch, Request, TransportError, decode_reply, encode_request,
    };
    use uuid::Uuid;

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<(u64, Vec<u8>)>>>,
    }

    impl ReplySender for RecordingSender {
        type Handle = u64;

        fn send(&self, handle: &u64, reply: &[u8]) {
            self.sent.lock().unwrap().push((*handle, reply.to_vec()));
        }
    }

    /// Never reached in these tests: every request targets the local group.
    struct NullTransport;

    impl GroupTransport for NullTransport {
        fn invoke_ordered(
            &self,
            group: GroupId,
            _command: &[u8],
        ) -> std::result::Result<Vec<u8>, TransportError> {
            Err(TransportError::Unreachable(group))
        }
    }

    fn leaf_service(config: ReplicaConfig) -> ReplicaService<NullTransport, RecordingSender> {
        let topology = Topology::build([(GroupId::new(0), vec![GroupId::new(1)])]).unwrap();
        ReplicaService::new(GroupId::new(1), Arc::new(topology), Arc::new(NullTransport), config)
    }

    fn local_request(id: u128) -> ClientRequest {
        ClientRequest::with_id(
            canopy_types::RequestId::from_uuid(Uuid::from_u128(id)),
            vec![GroupId::new(1)],
            Bytes::from_static(b"payload"),
        )
    }

    fn command(request: &Request) -> Bytes {
        Bytes::from(encode_request(request).unwrap())
    }

    #[test]
    fn undecodable_commands_fail_in_their_own_position() {
        let mut service = leaf_service(ReplicaConfig::testing());
        let garbage = Bytes::from_static(&[0xff, 0xff, 0xff]);
        let valid = command(&Request::Client(local_request(1)));

        let replies = service.execute_batch(&[garbage, valid]);

        assert_eq!(replies.len(), 2);
        let EngineReply::Done(bytes) = &replies[0] else {
            panic!("expected a resolved reply");
        };
        let degraded = decode_reply(bytes).unwrap().into_single().unwrap();
        assert_eq!(degraded.outcome, Outcome::InvalidPayload);

        let EngineReply::Done(bytes) = &replies[1] else {
            panic!("expected a resolved reply");
        };
        let settled = decode_reply(bytes).unwrap().into_single().unwrap();
        assert_eq!(settled.outcome, Outcome::Handled);
    }

    #[test]
    fn unordered_commands_are_unsupported() {
        let mut service = leaf_service(ReplicaConfig::testing());

        let reply = service.execute_unordered(b"anything");

        let EngineReply::Done(bytes) = reply else {
            panic!("expected a resolved reply");
        };
        let response = decode_reply(&bytes).unwrap().into_single().unwrap();
        assert_eq!(response.outcome, Outcome::Unsupported);
    }

    #[test]
    fn snapshots_round_trip_the_ledger() {
        let mut service = leaf_service(ReplicaConfig::testing());
        let commands = [
            command(&Request::Client(local_request(1))),
            command(&Request::Client(local_request(2))),
        ];
        service.execute_batch(&commands);

        let snapshot = service.snapshot().unwrap();
        let mut restored = leaf_service(ReplicaConfig::testing());
        restored.install_snapshot(&snapshot).unwrap();

        assert_eq!(restored.ledger(), service.ledger());
        // The restored replica answers settled requests from its cache.
        let replies = restored.execute_batch(&commands[..1]);
        assert!(matches!(replies[0], EngineReply::Done(_)));
    }

    #[test]
    fn settled_deferrals_release_through_the_broker() {
        let sender = RecordingSender::default();
        let config = ReplicaConfig::testing().with_min_receive_count(2);
        let mut service = leaf_service(config);
        service.broker().attach_sender(sender.clone());

        let batch = ForwardedBatch::new(vec![local_request(1)]);
        let bytes = command(&Request::Forwarded(batch.clone()));

        let replies = service.execute_batch(&[bytes.clone()]);
        assert_eq!(replies[0], EngineReply::Pending(batch.id()));
        service.broker().manage_reply(replies[0].clone(), 7);

        let replies = service.execute_batch(&[bytes]);
        let EngineReply::Done(settled) = &replies[0] else {
            panic!("expected a resolved reply");
        };

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 7);
        assert_eq!(&sent[0].1, &settled.to_vec());
    }
}
