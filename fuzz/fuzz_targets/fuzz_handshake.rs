#![no_main]

use libfuzzer_sys::fuzz_target;
use mysql_handshake::core::packet::Packet;
use mysql_handshake::protocol::handshake::Handshake;
use mysql_handshake::protocol::reply::AuthReply;

fuzz_target!(|data: &[u8]| {
    let Ok(packet) = Packet::new(0, data) else {
        return;
    };

    if let Ok(hs) = Handshake::decode(&packet) {
        // Anything that decodes must encode back to the same frame
        let encoded = hs.encode().expect("decoded greeting re-encodes");
        let again = Handshake::decode(&encoded).expect("re-encoded greeting decodes");
        assert_eq!(hs, again);
    }

    let _ = AuthReply::decode(&packet);
});
