//! Wire protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding wire messages.
///
/// Decoding keeps two failure modes apart: a payload that is not a protocol
/// message at all ([`WireError::Malformed`]) and a payload that decoded to a
/// well-formed message of the wrong kind ([`WireError::UnexpectedKind`]).
/// Callers degrade differently on each, so they must stay distinguishable.
#[derive(Debug, Error)]
pub enum WireError {
    /// The payload could not be decoded as a protocol message.
    #[error("malformed wire payload: {0}")]
    Malformed(postcard::Error),

    /// The payload decoded to a different message kind than the caller expected.
    #[error("unexpected message kind: expected {expected}, found {found}")]
    UnexpectedKind {
        /// The message kind the caller asked for.
        expected: &'static str,
        /// The message kind actually present in the payload.
        found: &'static str,
    },

    /// A message could not be serialized.
    #[error("failed to encode wire message: {0}")]
    Encode(postcard::Error),
}

/// Result type for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;
