//! The simulated cluster: one replica service per group.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use canopy_replica::{ReplicaConfig, ReplicaService};
use canopy_topology::Topology;
use canopy_types::GroupId;
use canopy_wire::{ClientRequest, Request, Response, decode_reply, encode_request};
use tracing::info;

use crate::error::Result;
use crate::transport::{MailboxSender, SimTransport, deliver};

/// The concrete service type simulated replicas run.
pub type SimService = ReplicaService<SimTransport, MailboxSender>;

pub(crate) struct SimGroup {
    pub(crate) service: SimService,
}

pub(crate) type GroupMap = BTreeMap<GroupId, Mutex<SimGroup>>;
pub(crate) type SharedGroups = Arc<OnceLock<GroupMap>>;

// ============================================================================
// SimConfig
// ============================================================================

/// Tuning for a simulated cluster.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Copies of each forwarded command delivered downstream, standing in
    /// for the sending group's replicas.
    pub redundancy: u32,

    /// Receive threshold every group enforces on forwarded copies.
    pub min_receive_count: u32,

    /// Response cache capacity per group.
    pub cache_capacity: usize,

    /// Attempts per next-hop round trip before it degrades.
    pub dispatch_attempts: u32,

    /// How long a delivery waits for a deferred reply to settle.
    pub wait_timeout: Duration,
}

impl Default for SimConfig {
    /// Mirrors the scaffolded group shape: four sending replicas, one
    /// tolerated fault.
    fn default() -> Self {
        Self {
            redundancy: 4,
            min_receive_count: 3,
            cache_capacity: ReplicaConfig::default().cache_capacity,
            dispatch_attempts: 3,
            wait_timeout: Duration::from_secs(5),
        }
    }
}

impl SimConfig {
    /// A single-copy configuration for tests that do not exercise the
    /// threshold.
    pub fn testing() -> Self {
        Self {
            redundancy: 1,
            min_receive_count: 1,
            cache_capacity: 64,
            dispatch_attempts: 1,
            wait_timeout: Duration::from_millis(500),
        }
    }
}

// ============================================================================
// SimCluster
// ============================================================================

/// An entire tree of groups inside one process.
pub struct SimCluster {
    topology: Arc<Topology>,
    groups: SharedGroups,
    wait_timeout: Duration,
}

impl SimCluster {
    /// Boots one replica service per topology group, wired together by the
    /// in-memory transport.
    pub fn new(topology: Arc<Topology>, config: SimConfig) -> Self {
        let groups: SharedGroups = Arc::new(OnceLock::new());
        let replica_config = ReplicaConfig {
            min_receive_count: config.min_receive_count,
            cache_capacity: config.cache_capacity,
            dispatch_attempts: config.dispatch_attempts,
        };

        let mut map = GroupMap::new();
        for group in topology.groups() {
            let transport = Arc::new(SimTransport::new(
                Arc::clone(&groups),
                config.redundancy,
                config.wait_timeout,
            ));
            let service = SimService::new(group, Arc::clone(&topology), transport, replica_config);
            service.broker().attach_sender(MailboxSender);
            map.insert(group, Mutex::new(SimGroup { service }));
        }

        // The cell is fresh, so this set cannot be contested.
        let _ = groups.set(map);

        info!(groups = topology.len(), "simulated cluster ready");
        Self {
            topology,
            groups,
            wait_timeout: config.wait_timeout,
        }
    }

    /// The tree this cluster realizes.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// A transport that submits like an external client: every command is
    /// delivered exactly once to the named group.
    pub fn client_transport(&self) -> SimTransport {
        SimTransport::new(Arc::clone(&self.groups), 1, self.wait_timeout)
    }

    /// Submits one client request to `entry` and decodes the aggregate
    /// response.
    pub fn submit_to(&self, entry: GroupId, request: &ClientRequest) -> Result<Response> {
        let command = encode_request(&Request::Client(request.clone()))?;
        let reply = deliver(&self.groups, entry, &command, 1, self.wait_timeout)?;
        Ok(decode_reply(&reply)?.into_single()?)
    }

    /// Runs `f` against one group's service under its lock.
    pub fn with_service<R>(
        &self,
        group: GroupId,
        f: impl FnOnce(&mut SimService) -> R,
    ) -> Option<R> {
        let cell = self.groups.get()?.get(&group)?;
        let mut guard = cell.lock().expect("sim group lock poisoned");
        Some(f(&mut guard.service))
    }
}
