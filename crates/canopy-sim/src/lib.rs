//! In-process multi-group simulation harness.
//!
//! Boots an entire tree of groups inside one process: each group runs a
//! real [`canopy_replica::ReplicaService`] behind an in-memory transport
//! that emulates sender-side redundancy, with a forwarding group's
//! replicas each submitting an equivalent ordered command downstream.
//! Integration tests, the interactive REPL, and the workload driver all
//! run against this harness.

pub mod cluster;
pub mod error;
pub mod transport;

pub use cluster::{SimCluster, SimConfig, SimService};
pub use error::{Result, SimError};
pub use transport::{MailboxSender, SimTransport};
