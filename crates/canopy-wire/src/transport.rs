//! Transport contract for ordered dispatch to groups.
//!
//! Routing layers never talk to a consensus endpoint directly; they hand an
//! encoded request to a [`GroupTransport`] and get the reply bytes back.
//! Implementations decide what sits behind a group identifier: an in-process
//! simulated group, a BFT client stub, anything that totally orders commands.

use canopy_types::GroupId;
use thiserror::Error;

/// Blocking, totally ordered dispatch to a single group.
///
/// `invoke_ordered` must not return until the target group has ordered and
/// executed the command, and the returned bytes must be that group's reply
/// to exactly this command. Implementations are shared across dispatch
/// threads, so they take `&self`.
pub trait GroupTransport: Send + Sync {
    /// Submits `command` to the group's ordered stream and waits for the reply.
    fn invoke_ordered(&self, group: GroupId, command: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// Errors surfaced by a transport during ordered dispatch.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No endpoint is configured for the target group.
    #[error("group {0} has no reachable endpoint")]
    Unreachable(GroupId),

    /// The call did not complete within the transport's deadline.
    #[error("ordered call to group {group} timed out")]
    Timeout {
        /// The group the call was addressed to.
        group: GroupId,
    },

    /// The target group failed while executing the command.
    #[error("group {group} failed to execute the command: {detail}")]
    Engine {
        /// The group the call was addressed to.
        group: GroupId,
        /// Implementation-specific failure description.
        detail: String,
    },
}
