//! Atomic multicast protocol messages.
//!
//! This module defines all messages exchanged between clients and groups:
//!
//! ## Requests
//! - [`ClientRequest`] - Client → Group: deliver this payload to the target groups
//! - [`ForwardedBatch`] - Group → Group: client requests relayed along one tree edge
//!
//! ## Replies
//! - [`Response`] - Group → Caller: outcome for a single request, downstream replies attached
//! - [`BatchResponse`] - Group → Group: positional outcomes for a relayed batch
//!
//! Payloads are sealed behind [`Request`] and [`Reply`] so a receiver can
//! always tell what kind of message it was handed before acting on it.

use bytes::Bytes;
use canopy_types::{GroupId, RequestId};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

// ============================================================================
// Requests
// ============================================================================

/// An ordered command submitted to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Client → Group: deliver this payload to the target groups.
    Client(ClientRequest),

    /// Group → Group: client requests relayed along one tree edge.
    Forwarded(ForwardedBatch),
}

impl Request {
    /// Returns the identifier a receiver keys this request under.
    ///
    /// For a relayed batch this is the derived batch identifier, not the
    /// identifier of any constituent request.
    pub fn id(&self) -> RequestId {
        match self {
            Request::Client(request) => request.id,
            Request::Forwarded(batch) => batch.id(),
        }
    }

    /// Returns a human-readable name for the request kind.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Client(_) => "ClientRequest",
            Request::Forwarded(_) => "ForwardedBatch",
        }
    }
}

/// A single multicast request originated by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Globally unique identifier chosen at submission time.
    pub id: RequestId,

    /// Groups that must deliver the payload.
    pub targets: Vec<GroupId>,

    /// Opaque application payload.
    pub content: Bytes,
}

impl ClientRequest {
    /// Creates a request with a freshly generated identifier.
    pub fn new(targets: Vec<GroupId>, content: Bytes) -> Self {
        Self::with_id(RequestId::generate(), targets, content)
    }

    /// Creates a request with an explicit identifier.
    pub fn with_id(id: RequestId, targets: Vec<GroupId>, content: Bytes) -> Self {
        Self {
            id,
            targets,
            content,
        }
    }

    /// Returns true if `group` is one of the delivery targets.
    pub fn targets_group(&self, group: GroupId) -> bool {
        self.targets.contains(&group)
    }
}

/// Client requests relayed from one group to the next hop on the tree.
///
/// The batch identifier is derived from the constituent request identifiers
/// in order, so sender and receiver agree on it without shipping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedBatch {
    /// The relayed requests, in the sender's processing order.
    pub requests: Vec<ClientRequest>,
}

impl ForwardedBatch {
    /// Creates a batch from already-ordered requests.
    pub fn new(requests: Vec<ClientRequest>) -> Self {
        Self { requests }
    }

    /// Returns the batch identifier derived from the constituent identifiers.
    pub fn id(&self) -> RequestId {
        RequestId::derived(self.requests.iter().map(|request| &request.id))
    }

    /// Returns the number of relayed requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns true if the batch carries no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

// ============================================================================
// Replies
// ============================================================================

/// The reply payload for an ordered command.
///
/// A client request is answered with [`Reply::Single`]; a relayed batch is
/// answered with [`Reply::Batch`]. Receivers that expect one kind unwrap it
/// with [`Reply::into_single`] or [`Reply::into_batch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// Answer to a [`ClientRequest`].
    Single(Response),

    /// Answer to a [`ForwardedBatch`], positionally aligned with it.
    Batch(BatchResponse),
}

impl Reply {
    /// Returns a human-readable name for the reply kind.
    pub fn name(&self) -> &'static str {
        match self {
            Reply::Single(_) => "Single",
            Reply::Batch(_) => "Batch",
        }
    }

    /// Unwraps the single-response form.
    pub fn into_single(self) -> Result<Response> {
        match self {
            Reply::Single(response) => Ok(response),
            other => Err(WireError::UnexpectedKind {
                expected: "Single",
                found: other.name(),
            }),
        }
    }

    /// Unwraps the batch form.
    pub fn into_batch(self) -> Result<BatchResponse> {
        match self {
            Reply::Batch(batch) => Ok(batch),
            other => Err(WireError::UnexpectedKind {
                expected: "Batch",
                found: other.name(),
            }),
        }
    }
}

/// How a group disposed of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The request was delivered to this group's engine.
    Handled,

    /// The request was relayed toward groups deeper in the tree.
    Forwarded,

    /// A target group is not reachable from here.
    NoPath,

    /// A downstream dispatch failed after all attempts.
    DispatchFailed,

    /// The payload could not be decoded as a request.
    InvalidPayload,

    /// The group hit an internal fault while replying.
    InternalError,

    /// The operation kind is not served by this engine.
    Unsupported,
}

impl Outcome {
    /// Returns true for outcomes that report a failure.
    pub fn is_error(self) -> bool {
        !matches!(self, Outcome::Handled | Outcome::Forwarded)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Outcome::Handled => "handled",
            Outcome::Forwarded => "forwarded",
            Outcome::NoPath => "no_path",
            Outcome::DispatchFailed => "dispatch_failed",
            Outcome::InvalidPayload => "invalid_payload",
            Outcome::InternalError => "internal_error",
            Outcome::Unsupported => "unsupported",
        };
        write!(f, "{name}")
    }
}

/// The outcome for a single request at one group.
///
/// When a request fans out, the replies from the contacted groups are kept
/// under `downstream`, sorted by group identifier. Each entry is itself a
/// full [`Response`], so the structure mirrors the routing tree below the
/// replying group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// How this group disposed of the request.
    pub outcome: Outcome,

    /// Replies gathered from the groups this request was relayed to.
    pub downstream: Vec<GroupReply>,
}

impl Response {
    /// Creates a response with no downstream replies.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            downstream: Vec::new(),
        }
    }

    /// Attaches a downstream reply, keeping `downstream` sorted by group.
    pub fn attach(&mut self, group: GroupId, response: Response) {
        let at = self.downstream.partition_point(|reply| reply.group < group);
        self.downstream.insert(at, GroupReply { group, response });
    }

    /// Returns the reply attached for `group`, if any.
    pub fn from_group(&self, group: GroupId) -> Option<&Response> {
        self.downstream
            .iter()
            .find(|reply| reply.group == group)
            .map(|reply| &reply.response)
    }
}

/// A downstream reply tagged with the group it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReply {
    /// The group that produced `response`.
    pub group: GroupId,

    /// That group's full response, downstream replies included.
    pub response: Response,
}

/// Responses for a relayed batch, in the batch's request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    /// One response per relayed request, positionally aligned.
    pub responses: Vec<Response>,
}

impl BatchResponse {
    /// Creates a batch response from already-ordered responses.
    pub fn new(responses: Vec<Response>) -> Self {
        Self { responses }
    }

    /// Returns the number of responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns true if the batch carries no responses.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
