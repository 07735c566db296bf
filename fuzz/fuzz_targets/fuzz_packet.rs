#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mysql_handshake::core::codec::PacketCodec;
use mysql_handshake::core::packet::Packet;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Whole-frame wrapping must reject, never panic
    let _ = Packet::from_bytes(data.to_vec());

    // Streaming decode over the same bytes
    let mut codec = PacketCodec::new();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(packet)) = codec.decode(&mut buf) {
        assert_eq!(packet.as_bytes().len(), packet.payload_len() + 4);
    }
});
