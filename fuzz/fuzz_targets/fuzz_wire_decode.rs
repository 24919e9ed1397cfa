#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decode arbitrary bytes as a request. This tests:
    // - Postcard deserialization robustness
    // - Enum variant handling for Client vs. Forwarded
    // - Nested batch structures
    if let Ok(request) = canopy_wire::decode_request(data) {
        // A message that decoded must re-encode, and the re-encoded
        // bytes must decode to the same message.
        let bytes = canopy_wire::encode_request(&request).unwrap();
        let again = canopy_wire::decode_request(&bytes).unwrap();
        assert_eq!(request, again);
    }

    // Same bytes, read as a reply envelope.
    if let Ok(reply) = canopy_wire::decode_reply(data) {
        let bytes = canopy_wire::encode_reply(&reply).unwrap();
        let again = canopy_wire::decode_reply(&bytes).unwrap();
        assert_eq!(reply, again);
    }
});
