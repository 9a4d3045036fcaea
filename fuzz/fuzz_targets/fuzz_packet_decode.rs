#![no_main]
use libfuzzer_sys::fuzz_target;

// `Packet::decode` must never panic on arbitrary bytes, and anything it
// accepts must re-encode to a buffer that decodes back to the same fields.
fuzz_target!(|data: &[u8]| {
    let Some(packet) = driftmesh::Packet::decode(data) else {
        return;
    };
    if let Ok(encoded) = packet.encode() {
        let reparsed = driftmesh::Packet::decode(&encoded).expect("re-encoded packet must decode");
        assert_eq!(reparsed.source_id, packet.source_id);
        assert_eq!(reparsed.dest_id, packet.dest_id);
        assert_eq!(reparsed.msg_type, packet.msg_type);
        assert_eq!(reparsed.payload, packet.payload);
    }
});
