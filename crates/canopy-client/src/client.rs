//! Multicast client: entry-group selection and request submission.

use std::sync::Arc;

use bytes::Bytes;
use canopy_topology::Topology;
use canopy_types::GroupId;
use canopy_wire::{
    ClientRequest, GroupTransport, Request, Response, decode_reply, encode_request,
};
use tracing::debug;

use crate::error::Result;

/// A client of the group tree.
///
/// Submissions enter at the lowest common ancestor of the target set, so
/// a single relayed copy reaches every target without duplicate delivery
/// paths.
pub struct MulticastClient<T> {
    topology: Arc<Topology>,
    transport: Arc<T>,
}

impl<T> Clone for MulticastClient<T> {
    fn clone(&self) -> Self {
        Self {
            topology: Arc::clone(&self.topology),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: GroupTransport> MulticastClient<T> {
    pub fn new(topology: Arc<Topology>, transport: Arc<T>) -> Self {
        Self {
            topology,
            transport,
        }
    }

    /// The tree submissions are routed over.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// Picks the entry group for a target set: their lowest common
    /// ancestor.
    pub fn entry_group(&self, targets: &[GroupId]) -> Result<GroupId> {
        Ok(self.topology.lowest_common_ancestor(targets)?)
    }

    /// Builds a fresh request and submits it at the computed entry group.
    pub fn submit(
        &self,
        targets: Vec<GroupId>,
        content: Bytes,
    ) -> Result<(ClientRequest, Response)> {
        let request = ClientRequest::new(targets, content);
        let response = self.submit_request(&request)?;
        Ok((request, response))
    }

    /// Submits a prepared request at the computed entry group.
    pub fn submit_request(&self, request: &ClientRequest) -> Result<Response> {
        let entry = self.entry_group(&request.targets)?;
        self.submit_request_to(entry, request)
    }

    /// Submits a prepared request at an explicit entry group.
    pub fn submit_request_to(&self, entry: GroupId, request: &ClientRequest) -> Result<Response> {
        debug!(request = %request.id, entry = %entry, "submitting client request");

        let command = encode_request(&Request::Client(request.clone()))?;
        let reply = self.transport.invoke_ordered(entry, &command)?;
        Ok(decode_reply(&reply)?.into_single()?)
    }
}
