//! # canopy-types: Core types for `Canopy`
//!
//! This crate contains shared identifier types used across the `Canopy`
//! system:
//! - Group identity ([`GroupId`]) — one node of the multicast tree
//! - Replica identity ([`ReplicaId`]) — one process within a group
//! - Request identity ([`RequestId`]) — unique per client request, with a
//!   deterministic derivation for forwarded batches

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs - All Copy (cheap fixed-size values)
// ============================================================================

/// Unique identifier for a replication group (one node of the topology tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(u64);

impl GroupId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the group ID as a `u64`.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for GroupId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<GroupId> for u64 {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

/// Unique identifier for a replica within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaId(u64);

impl ReplicaId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ReplicaId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ReplicaId> for u64 {
    fn from(id: ReplicaId) -> Self {
        id.0
    }
}

// ============================================================================
// Request Identity - Copy (16-byte UUID)
// ============================================================================

/// Namespace for deriving batch identifiers from constituent request IDs.
const BATCH_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x8e, 0x1c, 0x4a, 0x52, 0x6f, 0x0d, 0x4b, 0x9a, 0x92, 0x7b, 0x35, 0xd4, 0xe0, 0x1f, 0xab,
    0x60,
]);

/// Unique identifier for a multicast request.
///
/// Client-originated requests carry a random (v4) ID. Forwarded batches use
/// [`RequestId::derived`] so that equivalent batches independently produced
/// by every replica of the sending group share a single identifier — that is
/// what lets the receiving group count redundant copies toward its threshold.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    // ========================================================================
    // Functional Core (pure, testable)
    // ========================================================================

    /// Restoration from an existing UUID (wire decode, tests).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Derives the deterministic identifier for a batch of requests.
    ///
    /// The derivation is a v5 (name-based) UUID over the concatenated bytes
    /// of the constituent IDs, so it is order-sensitive: the sending replicas
    /// must assemble their batches in the same deterministic order for the
    /// derived IDs to match.
    pub fn derived<'a>(parts: impl IntoIterator<Item = &'a RequestId>) -> Self {
        let mut name = Vec::new();
        for part in parts {
            name.extend_from_slice(part.0.as_bytes());
        }
        Self(Uuid::new_v5(&BATCH_ID_NAMESPACE, &name))
    }

    // ========================================================================
    // Imperative Shell (randomness boundary)
    // ========================================================================

    /// Generates a fresh random (v4) request identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Debug for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}
