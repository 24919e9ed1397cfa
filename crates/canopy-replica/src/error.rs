//! Replica error types.

use thiserror::Error;

/// Errors surfaced at the replication engine boundary.
///
/// Faults inside batch processing never become errors here; the engine
/// contract requires one reply per delivered command, so those degrade into
/// error-marked responses instead.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// A checkpoint snapshot could not be serialized or installed.
    #[error("snapshot codec failure: {0}")]
    Snapshot(postcard::Error),
}

/// Result type for replica operations.
pub type Result<T> = std::result::Result<T, ReplicaError>;
