#![no_main]
use libfuzzer_sys::fuzz_target;

// `decode_batch` is the one facade parser that hand-rolls a length-prefixed
// wire format (spec.md §8's 12th-receipt boundary case); it must never
// panic on truncated or oversized input.
fuzz_target!(|data: &[u8]| {
    let _ = driftmesh::facades::receipt::decode_batch(data);
});
