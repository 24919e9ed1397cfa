//! Postcard codec for protocol messages.
//!
//! All wire payloads use postcard's compact, non-self-describing encoding.
//! Requests and replies are tagged enums, so a receiver can check the kind
//! of a decoded payload before acting on it; bytes that decode to no
//! protocol message at all surface as [`WireError::Malformed`].

use serde::Serialize;

use crate::error::{Result, WireError};
use crate::message::{Reply, Request};

/// Encodes a request for dispatch to a group.
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    to_bytes(request)
}

/// Decodes the ordered command bytes handed to a replica.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    postcard::from_bytes(bytes).map_err(WireError::Malformed)
}

/// Encodes a reply for the caller that submitted the command.
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    to_bytes(reply)
}

/// Decodes the reply bytes returned by a group.
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    postcard::from_bytes(bytes).map_err(WireError::Malformed)
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value).map_err(WireError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use canopy_types::{GroupId, RequestId};
    use proptest::prelude::*;
    use uuid::Uuid;

    use crate::message::{ClientRequest, ForwardedBatch, Outcome, Response};

    #[test]
    fn replies_round_trip_with_downstream_structure() {
        let mut child = Response::new(Outcome::Forwarded);
        child.attach(GroupId::new(3), Response::new(Outcome::Handled));

        let mut root = Response::new(Outcome::Forwarded);
        root.attach(GroupId::new(1), child);
        root.attach(GroupId::new(2), Response::new(Outcome::Handled));

        let reply = Reply::Single(root);
        let bytes = encode_reply(&reply).unwrap();
        assert_eq!(decode_reply(&bytes).unwrap(), reply);
    }

    #[test]
    fn garbage_is_reported_as_malformed() {
        // 0x02 is not a valid `Request` variant tag.
        let err = decode_request(&[0x02]).unwrap_err();
        assert!(matches!(err, WireError::Malformed(_)));

        let err = decode_reply(&[]).unwrap_err();
        assert!(matches!(err, WireError::Malformed(_)));
    }

    fn arb_client_request() -> impl Strategy<Value = ClientRequest> {
        (
            any::<u128>(),
            prop::collection::vec(0u64..32, 1..4),
            prop::collection::vec(any::<u8>(), 0..64),
        )
            .prop_map(|(id, targets, content)| {
                ClientRequest::with_id(
                    RequestId::from_uuid(Uuid::from_u128(id)),
                    targets.into_iter().map(GroupId::new).collect(),
                    Bytes::from(content),
                )
            })
    }

    fn arb_request() -> impl Strategy<Value = Request> {
        prop_oneof![
            arb_client_request().prop_map(Request::Client),
            prop::collection::vec(arb_client_request(), 1..4)
                .prop_map(|requests| Request::Forwarded(ForwardedBatch::new(requests))),
        ]
    }

    proptest! {
        /// Property: every request survives an encode/decode round trip.
        #[test]
        fn prop_requests_round_trip(request in arb_request()) {
            let bytes = encode_request(&request).unwrap();
            prop_assert_eq!(decode_request(&bytes).unwrap(), request);
        }
    }
}
