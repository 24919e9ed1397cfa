//! # Canopy
//!
//! Hierarchical Byzantine fault-tolerant atomic multicast.
//!
//! Canopy totally orders requests across independently replicated groups
//! arranged in a tree. A request names a set of target groups; it enters
//! at their lowest common ancestor and relays down parent→child edges,
//! each group ordering it through its own replication engine before
//! passing it on. Requests sharing a next hop travel in one batch, and
//! every relayed copy is held until enough sending replicas vouch for it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                          Canopy                           │
//! │  ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌────────┐  │
//! │  │ Topology │ → │  Handler  │ → │ Ledger  │   │ Broker │  │
//! │  │ (route)  │   │ (forward) │   │ (cache) │   │ (defer)│  │
//! │  └──────────┘   └───────────┘   └─────────┘   └────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use canopy::{Bytes, GroupId, MulticastClient, SimCluster, SimConfig, Topology};
//!
//! // 0 → {1, 2}
//! let topology = Arc::new(Topology::build([
//!     (GroupId::new(0), vec![GroupId::new(1), GroupId::new(2)]),
//! ])?);
//!
//! let cluster = SimCluster::new(Arc::clone(&topology), SimConfig::default());
//! let client = MulticastClient::new(topology, Arc::new(cluster.client_transport()));
//!
//! let (request, response) = client.submit(
//!     vec![GroupId::new(1), GroupId::new(2)],
//!     Bytes::from_static(b"hello"),
//! )?;
//! assert!(!response.outcome.is_error());
//! ```

// Re-export identifiers
pub use canopy_types::{GroupId, ReplicaId, RequestId};

// Re-export the tree model
pub use canopy_topology::{Topology, TopologyError};

// Re-export protocol messages and transport seams
pub use canopy_wire::{
    BatchResponse, ClientRequest, ForwardedBatch, GroupReply, GroupTransport, Outcome, Reply,
    Request, Response, TransportError, WireError,
};

// Re-export the replica stack
pub use canopy_replica::{
    EngineReply, OrderedService, ReplicaConfig, ReplicaError, ReplicaLedger, ReplicaService,
    ReplyBroker, ReplySender, RequestHandler,
};

// Re-export cluster configuration
pub use canopy_cluster::{ClusterError, GroupConfig, GroupDirs, scaffold_groups};

// Re-export the in-process harness
pub use canopy_sim::{SimCluster, SimConfig, SimError, SimTransport};

// Re-export the client library
pub use canopy_client::{
    ClientError, MulticastClient, WorkloadConfig, WorkloadReport, run_workload,
};

// Opaque payload type used throughout the API
pub use bytes::Bytes;
