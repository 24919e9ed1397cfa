//! In-memory transport between simulated groups.
//!
//! A real deployment forwards a batch by having every replica of the
//! sending group submit an equivalent ordered command to the destination
//! group's engine. [`SimTransport`] emulates that redundancy: one
//! `invoke_ordered` call delivers the command `redundancy` times, each
//! copy as its own single-command ordered batch, then waits for the
//! destination to settle it.

use std::sync::mpsc;
use std::time::Duration;

use bytes::Bytes;
use canopy_replica::{EngineReply, OrderedService};
use canopy_types::GroupId;
use canopy_wire::{GroupTransport, TransportError};
use tracing::debug;

use crate::cluster::SharedGroups;

/// Delivers replies to simulated callers over a channel.
///
/// The parked handle is the sending half itself, so a caller that gave up
/// waiting just drops its receiver and late replies fall on the floor.
pub struct MailboxSender;

impl canopy_replica::ReplySender for MailboxSender {
    type Handle = mpsc::Sender<Bytes>;

    fn send(&self, handle: &Self::Handle, reply: &[u8]) {
        if handle.send(Bytes::copy_from_slice(reply)).is_err() {
            debug!("mailbox receiver dropped before reply delivery");
        }
    }
}

/// The inter-group transport of a simulated cluster.
pub struct SimTransport {
    groups: SharedGroups,
    redundancy: u32,
    wait_timeout: Duration,
}

impl SimTransport {
    pub(crate) fn new(groups: SharedGroups, redundancy: u32, wait_timeout: Duration) -> Self {
        Self {
            groups,
            redundancy,
            wait_timeout,
        }
    }
}

impl GroupTransport for SimTransport {
    fn invoke_ordered(&self, group: GroupId, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        deliver(&self.groups, group, command, self.redundancy, self.wait_timeout)
            .map(|bytes| bytes.to_vec())
    }
}

/// Runs `copies` single-command ordered batches against one group and
/// returns the settled reply bytes.
///
/// The group lock is released before waiting, so a delivery that needs a
/// later copy to settle never blocks the group it is waiting on.
pub(crate) fn deliver(
    groups: &SharedGroups,
    group: GroupId,
    command: &[u8],
    copies: u32,
    wait_timeout: Duration,
) -> Result<Bytes, TransportError> {
    let map = groups.get().ok_or(TransportError::Unreachable(group))?;
    let cell = map.get(&group).ok_or(TransportError::Unreachable(group))?;

    let command = Bytes::copy_from_slice(command);
    let (reply_tx, reply_rx) = mpsc::channel();
    let mut settled = None;

    {
        let mut target = cell.lock().expect("sim group lock poisoned");
        for _ in 0..copies.max(1) {
            let mut replies = target.service.execute_batch(std::slice::from_ref(&command));
            match replies.pop() {
                Some(EngineReply::Done(bytes)) => settled = Some(bytes),
                Some(pending @ EngineReply::Pending(_)) => {
                    target.service.broker().manage_reply(pending, reply_tx.clone());
                }
                None => {
                    return Err(TransportError::Engine {
                        group,
                        detail: "engine returned no reply".into(),
                    });
                }
            }
        }
    }

    match settled {
        Some(bytes) => Ok(bytes),
        None => reply_rx
            .recv_timeout(wait_timeout)
            .map_err(|_| TransportError::Timeout { group }),
    }
}
