#![no_main]
use libfuzzer_sys::fuzz_target;

// `ChatPayload::decode` must never panic on arbitrary bytes, and any
// value it accepts must re-encode and decode back to the same payload.
fuzz_target!(|data: &[u8]| {
    let Some(payload) = driftmesh::facades::chat::ChatPayload::decode(data) else {
        return;
    };
    let re_encoded = payload.encode();
    let reparsed = driftmesh::facades::chat::ChatPayload::decode(&re_encoded).expect("re-encoded payload must decode");
    assert_eq!(reparsed, payload);
});
