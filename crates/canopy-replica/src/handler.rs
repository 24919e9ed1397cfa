//! Protocol core: the per-batch request state machine.
//!
//! Once the replication engine has ordered a batch, every replica of the
//! group runs this handler over the same input and must take the same
//! observable steps. The handler classifies each inbound item, advances
//! forwarded requests through their receive threshold, relays ready
//! requests toward their remaining targets (batched per next hop, one
//! dispatch thread per hop), aggregates the downstream replies, and
//! finally produces one tagged reply per inbound item plus the deferred
//! replies this batch settled.
//!
//! A request in flight moves through
//! `Unseen → Pending → Ready → Forwarding → Settled`; client requests skip
//! straight to Ready since they are authoritative on arrival.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use canopy_topology::Topology;
use canopy_types::{GroupId, RequestId};
use canopy_wire::{
    BatchResponse, ClientRequest, ForwardedBatch, GroupTransport, Outcome, Reply, Request,
    Response, decode_reply, encode_reply, encode_request,
};
use tracing::{debug, error, info, warn};

use crate::config::ReplicaConfig;
use crate::ledger::ReplicaLedger;
use crate::service::EngineReply;

// ============================================================================
// BatchOutput
// ============================================================================

/// Everything one ordered batch produced.
#[derive(Debug)]
pub struct BatchOutput {
    /// One tagged reply per inbound item, in input order.
    pub replies: Vec<EngineReply>,

    /// Deferred replies settled by this batch: the identifier of each
    /// forwarded batch that became answerable, with its final bytes.
    pub completions: Vec<(RequestId, Bytes)>,
}

// ============================================================================
// RequestHandler
// ============================================================================

/// One dispatch to a next-hop group, prepared before fan-out.
struct HopDispatch {
    hop: GroupId,
    batch: ForwardedBatch,
    bytes: Vec<u8>,
}

/// The per-batch protocol state machine for one group replica.
pub struct RequestHandler<T> {
    group: GroupId,
    topology: Arc<Topology>,
    transport: Arc<T>,
    config: ReplicaConfig,

    /// Forwarded batches awaiting a constituent, keyed by the first request
    /// identifier that was unsettled when the batch was answered. This is
    /// connection-local bookkeeping and deliberately not part of the
    /// checkpointed ledger.
    waiting: BTreeMap<RequestId, Vec<ForwardedBatch>>,
}

impl<T: GroupTransport> RequestHandler<T> {
    /// Creates the handler for one replica of `group`.
    pub fn new(
        group: GroupId,
        topology: Arc<Topology>,
        transport: Arc<T>,
        config: ReplicaConfig,
    ) -> Self {
        Self {
            group,
            topology,
            transport,
            config,
            waiting: BTreeMap::new(),
        }
    }

    /// Returns the group this handler serves.
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Returns the number of request identifiers with parked batches.
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Processes one ordered batch.
    ///
    /// The ledger mutations performed here are the only ones in the system,
    /// and the engine calls this sequentially, so replicas fed the same
    /// ordered input stay bit-for-bit identical.
    pub fn handle_batch(
        &mut self,
        ledger: &mut ReplicaLedger,
        inputs: Vec<Request>,
    ) -> BatchOutput {
        let ready = self.collect_ready(ledger, &inputs);
        let settled = self.process_ready(ledger, ready);

        let replies = inputs
            .iter()
            .map(|input| self.reply_for(ledger, input))
            .collect();
        let completions = self.release_settled(ledger, &settled);

        BatchOutput {
            replies,
            completions,
        }
    }

    /// Classifies the batch: client requests are ready immediately,
    /// forwarded constituents advance their receive counter and become
    /// ready when it reaches the threshold. Settled requests never
    /// re-enter, and duplicates within the batch collapse into one entry.
    fn collect_ready(
        &self,
        ledger: &mut ReplicaLedger,
        inputs: &[Request],
    ) -> BTreeMap<RequestId, ClientRequest> {
        let mut ready = BTreeMap::new();

        for input in inputs {
            match input {
                Request::Client(request) => {
                    info!(request = %request.id, from_batch = false, "got request");
                    if ledger.is_cached(request.id) {
                        debug!(request = %request.id, "request already settled");
                        continue;
                    }
                    ready.insert(request.id, request.clone());
                }
                Request::Forwarded(batch) => {
                    for request in &batch.requests {
                        info!(request = %request.id, from_batch = true, "got request");
                        if ledger.is_cached(request.id) {
                            debug!(request = %request.id, "request already settled");
                            continue;
                        }
                        if ledger.enqueue(request.id) {
                            ready.insert(request.id, request.clone());
                        }
                    }
                }
            }
        }

        ready
    }

    /// Runs every ready request through local delivery, routing, and the
    /// fan-out to next-hop groups, then caches the finalized responses.
    /// Returns the identifiers settled by this batch, in canonical order.
    fn process_ready(
        &self,
        ledger: &mut ReplicaLedger,
        ready: BTreeMap<RequestId, ClientRequest>,
    ) -> Vec<RequestId> {
        let mut responses = self.settle_local(ledger, &ready);
        let plan = self.plan_dispatches(&ready, &mut responses);
        self.dispatch_and_merge(plan, &mut responses);

        let settled: Vec<RequestId> = responses.keys().copied().collect();
        for (id, response) in responses {
            ledger.cache_response(id, response);
        }
        settled
    }

    /// Delivers each ready request locally when this group is among its
    /// targets, seeding the response that downstream replies attach to.
    fn settle_local(
        &self,
        ledger: &mut ReplicaLedger,
        ready: &BTreeMap<RequestId, ClientRequest>,
    ) -> BTreeMap<RequestId, Response> {
        let mut responses = BTreeMap::new();

        for (id, request) in ready {
            let outcome = if request.targets_group(self.group) {
                ledger.mark_handled(*id);
                info!(request = %id, "request delivered locally");
                Outcome::Handled
            } else {
                Outcome::Forwarded
            };
            responses.insert(*id, Response::new(outcome));
        }

        responses
    }

    /// Routes each request's remaining targets and groups the results by
    /// next hop, so every hop receives a single batched dispatch. An
    /// unroutable target settles its request with a terminal no-path
    /// response instead of joining the plan.
    fn plan_dispatches(
        &self,
        ready: &BTreeMap<RequestId, ClientRequest>,
        responses: &mut BTreeMap<RequestId, Response>,
    ) -> BTreeMap<GroupId, Vec<ClientRequest>> {
        let mut per_hop: BTreeMap<GroupId, Vec<ClientRequest>> = BTreeMap::new();

        for (id, request) in ready {
            let remaining: Vec<GroupId> = request
                .targets
                .iter()
                .copied()
                .filter(|target| *target != self.group)
                .collect();
            if remaining.is_empty() {
                continue;
            }

            let routed = match self.topology.route_targets(self.group, &remaining) {
                Ok(routed) => routed,
                Err(err) => {
                    error!(
                        request = %id,
                        group = %self.group,
                        targets = ?remaining,
                        error = %err,
                        "no route to request targets"
                    );
                    responses.insert(*id, Response::new(Outcome::NoPath));
                    continue;
                }
            };

            for (hop, targets) in routed {
                per_hop
                    .entry(hop)
                    .or_default()
                    .push(ClientRequest::with_id(*id, targets, request.content.clone()));
            }
        }

        per_hop
    }

    /// Dispatches every planned batch concurrently, one thread per next
    /// hop, and merges each hop's replies back into the owning responses.
    /// A failed dispatch degrades into a failure marker for that hop only.
    fn dispatch_and_merge(
        &self,
        plan: BTreeMap<GroupId, Vec<ClientRequest>>,
        responses: &mut BTreeMap<RequestId, Response>,
    ) {
        if plan.is_empty() {
            return;
        }

        let mut dispatches = Vec::with_capacity(plan.len());
        for (hop, requests) in plan {
            let batch = ForwardedBatch::new(requests);
            match encode_request(&Request::Forwarded(batch.clone())) {
                Ok(bytes) => dispatches.push(HopDispatch { hop, batch, bytes }),
                Err(err) => {
                    error!(hop = %hop, error = %err, "failed to encode forwarded batch");
                    attach_failure(responses, hop, &batch);
                }
            }
        }

        let outcomes: Vec<Option<BatchResponse>> = std::thread::scope(|scope| {
            let workers: Vec<_> = dispatches
                .iter()
                .map(|dispatch| scope.spawn(move || self.exchange(dispatch)))
                .collect();
            workers
                .into_iter()
                .map(|worker| match worker.join() {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!("dispatch thread panicked");
                        None
                    }
                })
                .collect()
        });

        for (dispatch, outcome) in dispatches.iter().zip(outcomes) {
            match outcome {
                Some(reply) => {
                    for (request, response) in dispatch.batch.requests.iter().zip(reply.responses) {
                        if let Some(owner) = responses.get_mut(&request.id) {
                            owner.attach(dispatch.hop, response);
                        }
                    }
                }
                None => attach_failure(responses, dispatch.hop, &dispatch.batch),
            }
        }
    }

    /// One bounded-retry ordered round-trip to a next-hop group.
    fn exchange(&self, dispatch: &HopDispatch) -> Option<BatchResponse> {
        let attempts = self.config.dispatch_attempts.max(1);
        for attempt in 1..=attempts {
            match self.transport.invoke_ordered(dispatch.hop, &dispatch.bytes) {
                Ok(reply) => return accept_reply(dispatch, &reply),
                Err(err) => warn!(
                    hop = %dispatch.hop,
                    attempt,
                    error = %err,
                    "ordered dispatch failed"
                ),
            }
        }

        error!(hop = %dispatch.hop, attempts, "dispatch abandoned");
        None
    }

    /// Produces the tagged engine reply for one inbound item.
    ///
    /// Client requests are always answerable within their own batch. A
    /// forwarded batch defers until every constituent has settled, parking
    /// itself under the first one that has not.
    fn reply_for(&mut self, ledger: &mut ReplicaLedger, input: &Request) -> EngineReply {
        match input {
            Request::Client(request) => match ledger.get_cached(request.id) {
                Some(response) => encode_done(&Reply::Single(response.clone())),
                None => {
                    error!(request = %request.id, "no settled response for client request");
                    encode_done(&Reply::Single(Response::new(Outcome::InternalError)))
                }
            },
            Request::Forwarded(batch) => self.reply_for_batch(ledger, batch),
        }
    }

    fn reply_for_batch(
        &mut self,
        ledger: &mut ReplicaLedger,
        batch: &ForwardedBatch,
    ) -> EngineReply {
        let mut responses = Vec::with_capacity(batch.len());

        for request in &batch.requests {
            match ledger.get_cached(request.id) {
                Some(response) => responses.push(response.clone()),
                None => {
                    debug!(request = %request.id, "constituent unsettled, deferring batch");
                    self.waiting
                        .entry(request.id)
                        .or_default()
                        .push(batch.clone());
                    return EngineReply::Pending(batch.id());
                }
            }
        }

        encode_done(&Reply::Batch(BatchResponse::new(responses)))
    }

    /// Re-evaluates forwarded batches parked on requests this batch
    /// settled. Completed batches are returned for release; the rest park
    /// again under their next unsettled constituent.
    fn release_settled(
        &mut self,
        ledger: &mut ReplicaLedger,
        settled: &[RequestId],
    ) -> Vec<(RequestId, Bytes)> {
        let mut completions: BTreeMap<RequestId, Bytes> = BTreeMap::new();

        for id in settled {
            let Some(batches) = self.waiting.remove(id) else {
                continue;
            };
            for batch in batches {
                match self.reply_for_batch(ledger, &batch) {
                    EngineReply::Done(bytes) => {
                        info!(batch = %batch.id(), "deferred batch settled");
                        completions.insert(batch.id(), bytes);
                    }
                    // Parked again under its next unsettled constituent.
                    EngineReply::Pending(_) => {}
                }
            }
        }

        completions.into_iter().collect()
    }
}

/// Marks every constituent of a failed hop dispatch with a degraded
/// failure response for that hop.
fn attach_failure(
    responses: &mut BTreeMap<RequestId, Response>,
    hop: GroupId,
    batch: &ForwardedBatch,
) {
    for request in &batch.requests {
        if let Some(owner) = responses.get_mut(&request.id) {
            owner.attach(hop, Response::new(Outcome::DispatchFailed));
        }
    }
}

/// Validates a next-hop reply: it must be a batch response positionally
/// aligned with the dispatched batch.
fn accept_reply(dispatch: &HopDispatch, reply: &[u8]) -> Option<BatchResponse> {
    let reply = match decode_reply(reply).and_then(Reply::into_batch) {
        Ok(reply) => reply,
        Err(err) => {
            error!(hop = %dispatch.hop, error = %err, "invalid reply from next hop");
            return None;
        }
    };

    if reply.len() != dispatch.batch.len() {
        error!(
            hop = %dispatch.hop,
            expected = dispatch.batch.len(),
            got = reply.len(),
            "misaligned batch reply from next hop"
        );
        return None;
    }

    Some(reply)
}

/// Encodes a resolved reply; a codec failure still yields a reply so the
/// engine contract holds, just with no payload.
pub(crate) fn encode_done(reply: &Reply) -> EngineReply {
    match encode_reply(reply) {
        Ok(bytes) => EngineReply::Done(Bytes::from(bytes)),
        Err(err) => {
            error!(error = %err, "failed to encode engine reply");
            EngineReply::Done(Bytes::new())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use canopy_wire::TransportError;
    use canopy_wire::decode_request;
    use uuid::Uuid;

    fn tree() -> Arc<Topology> {
        let topology = Topology::build([
            (GroupId::new(0), vec![GroupId::new(1), GroupId::new(2)]),
            (GroupId::new(1), vec![GroupId::new(3)]),
        ])
        .unwrap();
        Arc::new(topology)
    }

    fn request(id: u128, targets: &[u64]) -> ClientRequest {
        ClientRequest::with_id(
            RequestId::from_uuid(Uuid::from_u128(id)),
            targets.iter().copied().map(GroupId::new).collect(),
            Bytes::from_static(b"payload"),
        )
    }

    fn single(reply: &EngineReply) -> Response {
        let EngineReply::Done(bytes) = reply else {
            panic!("expected a resolved reply, got {reply:?}");
        };
        decode_reply(bytes).unwrap().into_single().unwrap()
    }

    /// Answers every forwarded constituent with a handled marker and
    /// records the dispatched batches.
    #[derive(Default)]
    struct EchoTransport {
        calls: Mutex<Vec<(GroupId, ForwardedBatch)>>,
    }

    impl EchoTransport {
        fn calls(&self) -> Vec<(GroupId, ForwardedBatch)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GroupTransport for EchoTransport {
        fn invoke_ordered(&self, group: GroupId, command: &[u8]) -> Result<Vec<u8>, TransportError> {
            let request = decode_request(command).map_err(|err| TransportError::Engine {
                group,
                detail: err.to_string(),
            })?;
            let Request::Forwarded(batch) = request else {
                return Err(TransportError::Engine {
                    group,
                    detail: "expected a forwarded batch".into(),
                });
            };

            let responses = batch
                .requests
                .iter()
                .map(|_| Response::new(Outcome::Handled))
                .collect();
            self.calls.lock().unwrap().push((group, batch));
            encode_reply(&Reply::Batch(BatchResponse::new(responses))).map_err(|err| {
                TransportError::Engine {
                    group,
                    detail: err.to_string(),
                }
            })
        }
    }

    #[derive(Default)]
    struct FailingTransport {
        attempts: Mutex<u32>,
    }

    impl GroupTransport for FailingTransport {
        fn invoke_ordered(&self, group: GroupId, _command: &[u8]) -> Result<Vec<u8>, TransportError> {
            *self.attempts.lock().unwrap() += 1;
            Err(TransportError::Timeout { group })
        }
    }

    struct MisalignedTransport;

    impl GroupTransport for MisalignedTransport {
        fn invoke_ordered(&self, _group: GroupId, _command: &[u8]) -> Result<Vec<u8>, TransportError> {
            Ok(encode_reply(&Reply::Batch(BatchResponse::new(Vec::new()))).unwrap())
        }
    }

    #[test]
    fn an_empty_batch_produces_no_replies() {
        let transport = Arc::new(EchoTransport::default());
        let mut handler =
            RequestHandler::new(GroupId::new(0), tree(), transport, ReplicaConfig::testing());
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let output = handler.handle_batch(&mut ledger, Vec::new());

        assert!(output.replies.is_empty());
        assert!(output.completions.is_empty());
    }

    #[test]
    fn multi_target_requests_fan_out_and_aggregate() {
        let transport = Arc::new(EchoTransport::default());
        let mut handler = RequestHandler::new(
            GroupId::new(0),
            tree(),
            Arc::clone(&transport),
            ReplicaConfig::testing(),
        );
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let request = request(1, &[1, 2]);
        let output = handler.handle_batch(&mut ledger, vec![Request::Client(request)]);

        assert_eq!(output.replies.len(), 1);
        assert!(output.completions.is_empty());

        let response = single(&output.replies[0]);
        assert_eq!(response.outcome, Outcome::Forwarded);
        let contacted: Vec<u64> = response
            .downstream
            .iter()
            .map(|reply| reply.group.as_u64())
            .collect();
        assert_eq!(contacted, vec![1, 2]);
        assert!(
            response
                .downstream
                .iter()
                .all(|reply| reply.response.outcome == Outcome::Handled)
        );
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn the_local_target_is_delivered_before_forwarding() {
        let transport = Arc::new(EchoTransport::default());
        let mut handler = RequestHandler::new(
            GroupId::new(0),
            tree(),
            Arc::clone(&transport),
            ReplicaConfig::testing(),
        );
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let request = request(1, &[0, 1]);
        let id = request.id;
        let output = handler.handle_batch(&mut ledger, vec![Request::Client(request)]);

        let response = single(&output.replies[0]);
        assert_eq!(response.outcome, Outcome::Handled);
        assert!(ledger.was_handled(id));

        // Only the non-local target goes downstream.
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let (hop, batch) = &calls[0];
        assert_eq!(hop.as_u64(), 1);
        assert_eq!(batch.requests[0].targets, vec![GroupId::new(1)]);
    }

    #[test]
    fn requests_sharing_a_next_hop_travel_in_one_batch() {
        let transport = Arc::new(EchoTransport::default());
        let mut handler = RequestHandler::new(
            GroupId::new(0),
            tree(),
            Arc::clone(&transport),
            ReplicaConfig::testing(),
        );
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let output = handler.handle_batch(
            &mut ledger,
            vec![
                Request::Client(request(1, &[3])),
                Request::Client(request(2, &[3])),
            ],
        );

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_u64(), 1);
        assert_eq!(calls[0].1.len(), 2);
        assert!(matches!(output.replies[0], EngineReply::Done(_)));
        assert!(matches!(output.replies[1], EngineReply::Done(_)));
    }

    #[test]
    fn forwarded_batches_defer_until_the_threshold_is_met() {
        let transport = Arc::new(EchoTransport::default());
        let config = ReplicaConfig::testing().with_min_receive_count(3);
        let mut handler =
            RequestHandler::new(GroupId::new(3), tree(), Arc::clone(&transport), config);
        let mut ledger = ReplicaLedger::new(&config);

        let batch = ForwardedBatch::new(vec![request(1, &[3])]);
        let constituent = batch.requests[0].id;

        for _ in 0..2 {
            let output = handler.handle_batch(&mut ledger, vec![Request::Forwarded(batch.clone())]);
            assert_eq!(output.replies, vec![EngineReply::Pending(batch.id())]);
            assert!(output.completions.is_empty());
        }
        assert_eq!(handler.waiting_count(), 1);
        assert_eq!(ledger.pending_count(constituent), Some(2));

        let output = handler.handle_batch(&mut ledger, vec![Request::Forwarded(batch.clone())]);

        let EngineReply::Done(bytes) = &output.replies[0] else {
            panic!("expected a resolved reply");
        };
        let reply = decode_reply(bytes).unwrap().into_batch().unwrap();
        assert_eq!(reply.responses[0].outcome, Outcome::Handled);

        // Both earlier copies release now, with the same final bytes.
        assert_eq!(output.completions.len(), 1);
        assert_eq!(output.completions[0].0, batch.id());
        assert_eq!(&output.completions[0].1, bytes);
        assert_eq!(handler.waiting_count(), 0);
        assert!(ledger.was_handled(constituent));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn late_copies_of_a_settled_request_never_reforward() {
        let transport = Arc::new(EchoTransport::default());
        let config = ReplicaConfig::testing().with_min_receive_count(2);
        let mut handler =
            RequestHandler::new(GroupId::new(0), tree(), Arc::clone(&transport), config);
        let mut ledger = ReplicaLedger::new(&config);

        let batch = ForwardedBatch::new(vec![request(1, &[1])]);
        let constituent = batch.requests[0].id;

        let first = handler.handle_batch(&mut ledger, vec![Request::Forwarded(batch.clone())]);
        assert_eq!(first.replies, vec![EngineReply::Pending(batch.id())]);

        let second = handler.handle_batch(&mut ledger, vec![Request::Forwarded(batch.clone())]);
        assert!(matches!(second.replies[0], EngineReply::Done(_)));
        assert_eq!(ledger.pending_count(constituent), None);
        assert_eq!(transport.calls().len(), 1);

        let third = handler.handle_batch(&mut ledger, vec![Request::Forwarded(batch)]);
        assert_eq!(third.replies, second.replies);
        assert!(third.completions.is_empty());
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn unroutable_targets_fail_only_their_own_request() {
        let transport = Arc::new(EchoTransport::default());
        let mut handler = RequestHandler::new(
            GroupId::new(0),
            tree(),
            Arc::clone(&transport),
            ReplicaConfig::testing(),
        );
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let output = handler.handle_batch(
            &mut ledger,
            vec![
                Request::Client(request(1, &[9])),
                Request::Client(request(2, &[2])),
            ],
        );

        let stray = single(&output.replies[0]);
        assert_eq!(stray.outcome, Outcome::NoPath);
        assert!(stray.downstream.is_empty());

        let routed = single(&output.replies[1]);
        assert_eq!(routed.outcome, Outcome::Forwarded);
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn exhausted_dispatches_degrade_to_a_failure_marker() {
        let transport = Arc::new(FailingTransport::default());
        let config = ReplicaConfig {
            dispatch_attempts: 3,
            ..ReplicaConfig::testing()
        };
        let mut handler =
            RequestHandler::new(GroupId::new(0), tree(), Arc::clone(&transport), config);
        let mut ledger = ReplicaLedger::new(&config);

        let output = handler.handle_batch(&mut ledger, vec![Request::Client(request(1, &[1]))]);

        let response = single(&output.replies[0]);
        assert_eq!(response.outcome, Outcome::Forwarded);
        assert_eq!(
            response.from_group(GroupId::new(1)).map(|r| r.outcome),
            Some(Outcome::DispatchFailed)
        );
        assert_eq!(*transport.attempts.lock().unwrap(), 3);
    }

    #[test]
    fn misaligned_batch_replies_are_rejected() {
        let transport = Arc::new(MisalignedTransport);
        let mut handler = RequestHandler::new(
            GroupId::new(0),
            tree(),
            transport,
            ReplicaConfig::testing(),
        );
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let output = handler.handle_batch(&mut ledger, vec![Request::Client(request(1, &[1]))]);

        let response = single(&output.replies[0]);
        assert_eq!(
            response.from_group(GroupId::new(1)).map(|r| r.outcome),
            Some(Outcome::DispatchFailed)
        );
    }

    #[test]
    fn duplicate_client_requests_resolve_from_the_cache() {
        let transport = Arc::new(EchoTransport::default());
        let mut handler = RequestHandler::new(
            GroupId::new(0),
            tree(),
            Arc::clone(&transport),
            ReplicaConfig::testing(),
        );
        let mut ledger = ReplicaLedger::new(&ReplicaConfig::testing());

        let request = request(1, &[1]);
        let first = handler.handle_batch(&mut ledger, vec![Request::Client(request.clone())]);
        let second = handler.handle_batch(&mut ledger, vec![Request::Client(request)]);

        assert_eq!(first.replies, second.replies);
        assert_eq!(transport.calls().len(), 1);
    }
}
