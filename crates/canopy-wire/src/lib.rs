//! Binary wire protocol for Canopy.
//!
//! Everything that crosses a group boundary is defined here:
//! - Protocol messages ([`Request`] going down the tree, [`Reply`] coming back)
//! - The postcard codec with a strict malformed/mismatch error split
//! - The [`GroupTransport`] contract that routing layers dispatch through

pub mod codec;
pub mod error;
pub mod message;
pub mod transport;

pub use codec::{decode_reply, decode_request, encode_reply, encode_request};
pub use error::{Result, WireError};
pub use message::{
    BatchResponse, ClientRequest, ForwardedBatch, GroupReply, Outcome, Reply, Request, Response,
};
pub use transport::{GroupTransport, TransportError};
