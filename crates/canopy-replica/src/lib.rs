//! Per-replica multicast protocol core.
//!
//! Everything a single group replica runs between its replication engine
//! and the rest of the tree:
//!
//! - [`ReplicaLedger`]: the replicated settlement state (receive counters,
//!   handled set, bounded response cache) that snapshots capture.
//! - [`RequestHandler`]: the deterministic per-batch state machine that
//!   classifies, forwards, aggregates, and settles requests.
//! - [`ReplyBroker`]: connection-side parking lot for deferred replies.
//! - [`ReplicaService`]: the [`OrderedService`] adapter the engine drives.
//!
//! Determinism is the load-bearing property: every mutation of replicated
//! state happens inside `execute_batch`, keyed only by the ordered input,
//! so all replicas of a group stay interchangeable.

pub mod broker;
pub mod config;
pub mod error;
pub mod handler;
pub mod ledger;
pub mod service;

pub use broker::{ReplyBroker, ReplySender};
pub use config::ReplicaConfig;
pub use error::{ReplicaError, Result};
pub use handler::{BatchOutput, RequestHandler};
pub use ledger::{ReplicaLedger, ResponseCache};
pub use service::{EngineReply, OrderedService, ReplicaService};
