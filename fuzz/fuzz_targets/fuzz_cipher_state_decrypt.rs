#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

// A real Noise XX handshake produces the only `CipherState`s this crate
// ever constructs (its constructor is crate-private). Fuzz the receive
// side's `decrypt` with arbitrary frames from a real, already-established
// session: it must never panic, regardless of what garbage is thrown at
// it, and must only ever return `Ok` for a frame this same session
// actually produced.
fn established_recv() -> &'static std::sync::Mutex<driftmesh::noise::CipherState> {
    static RECV: OnceLock<std::sync::Mutex<driftmesh::noise::CipherState>> = OnceLock::new();
    RECV.get_or_init(|| {
        use driftmesh::noise::handshake::{peek_remote_ephemeral, HandshakeState};

        fn static_dh(secret: &[u8; 32], remote_ephemeral: &[u8; 32]) -> [u8; 32] {
            driftmesh::CryptoSuite::new().diffie_hellman(secret, remote_ephemeral)
        }

        let suite = driftmesh::CryptoSuite::new();
        let (i_static_pub, i_static_secret) = suite.generate_static_keypair();
        let (i_signing_pub, _) = suite.generate_signing_keypair();
        let (r_static_pub, r_static_secret) = suite.generate_static_keypair();
        let (r_signing_pub, _) = suite.generate_signing_keypair();

        let (mut initiator, msg1) = HandshakeState::initiate(i_static_pub, i_signing_pub);
        let mut responder = HandshakeState::respond(r_static_pub, r_signing_pub);

        let remote_e = peek_remote_ephemeral(&msg1).unwrap();
        let es_dh = static_dh(&r_static_secret, &remote_e);
        let msg2 = responder.read_msg1_write_msg2(&msg1, es_dh).unwrap();

        let remote_e = peek_remote_ephemeral(&msg2).unwrap();
        let se_dh = static_dh(&i_static_secret, &remote_e);
        let (msg3, init_out) = initiator.read_msg2_write_msg3(&msg2, se_dh).unwrap();

        let resp_out = responder.read_msg3(&msg3).unwrap();
        drop(init_out.send);
        std::sync::Mutex::new(resp_out.recv)
    })
}

fuzz_target!(|data: &[u8]| {
    let mut recv = established_recv().lock().unwrap();
    let _ = recv.decrypt(data);
});
