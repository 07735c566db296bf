//! Property-based tests using proptest
//!
//! These tests validate framing, decoding and scrambling invariants across randomly
//! generated inputs. Decoders must return errors, never panic.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use mysql_handshake::config::ClientConfig;
use mysql_handshake::core::codec::PacketCodec;
use mysql_handshake::core::field::{FieldDecoder, FieldEncoder};
use mysql_handshake::core::packet::Packet;
use mysql_handshake::protocol::capabilities::CapabilityFlags;
use mysql_handshake::protocol::handshake::Handshake;
use mysql_handshake::protocol::reply::AuthReply;
use mysql_handshake::protocol::response::{negotiate, HandshakeResponse};
use mysql_handshake::protocol::scramble::{scramble, scramble_native};
use mysql_handshake::Credentials;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

fn challenge_strategy() -> impl Strategy<Value = Vec<u8>> {
    // servers never put 0x00 in a challenge
    prop::collection::vec(1u8..=255, 20)
}

// Property: the header always states the body length and sequence id
proptest! {
    #[test]
    fn prop_packet_header_matches_body(
        seq in any::<u8>(),
        payload in prop::collection::vec(any::<u8>(), 0..10000),
    ) {
        let packet = Packet::new(seq, &payload).expect("payload fits");
        let bytes = packet.as_bytes();

        prop_assert_eq!(bytes.len(), payload.len() + 4);
        prop_assert_eq!(
            bytes[0] as usize | (bytes[1] as usize) << 8 | (bytes[2] as usize) << 16,
            payload.len()
        );
        prop_assert_eq!(bytes[3], seq);
        prop_assert_eq!(packet.payload().to_vec(), payload.clone());
    }
}

// Property: the codec yields the same frames however the stream is chunked
proptest! {
    #[test]
    fn prop_codec_chunking_invariant(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..8),
        chunk in 1usize..64,
    ) {
        let mut wire = Vec::new();
        for (i, p) in payloads.iter().enumerate() {
            wire.extend_from_slice(Packet::new(i as u8, p).unwrap().as_bytes());
        }

        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(packet) = codec.decode(&mut buf).unwrap() {
                decoded.push(packet);
            }
        }

        prop_assert_eq!(decoded.len(), payloads.len());
        for (i, (packet, payload)) in decoded.iter().zip(payloads.iter()).enumerate() {
            prop_assert_eq!(packet.sequence_id(), i as u8);
            prop_assert_eq!(packet.payload().to_vec(), payload.clone());
        }
    }
}

// Property: the greeting decoder never panics on arbitrary frame bodies
proptest! {
    #[test]
    fn prop_handshake_decode_never_panics(
        seq in any::<u8>(),
        body in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let packet = Packet::new(seq, &body).unwrap();
        let _ = Handshake::decode(&packet);
    }
}

// Property: truncating a valid greeting always fails, and the failure names a field
proptest! {
    #[test]
    fn prop_truncated_greeting_fails(
        challenge in challenge_strategy(),
        thread_id in any::<u32>(),
        cut_ratio in 0.0f64..1.0,
    ) {
        let full = Handshake::builder()
            .thread_id(thread_id)
            .challenge(&challenge)
            .build()
            .encode()
            .unwrap();
        let body = full.payload();
        let cut = ((body.len() as f64) * cut_ratio) as usize;
        let truncated = Packet::new(0, &body[..cut]).unwrap();

        let err = Handshake::decode(&truncated).expect_err("truncated greeting must fail");
        prop_assert!(err.field().is_some(), "no field in {:?}", err);
    }
}

// Property: any encoded greeting decodes back to the same fields
proptest! {
    #[test]
    fn prop_greeting_fields_survive_encoding(
        challenge in challenge_strategy(),
        thread_id in any::<u32>(),
        caps in any::<u32>(),
        charset in any::<u8>(),
        status in any::<u16>(),
        version in "[0-9a-zA-Z.-]{0,32}",
    ) {
        let original = Handshake::builder()
            .server_version(version)
            .thread_id(thread_id)
            .challenge(&challenge)
            .capabilities(CapabilityFlags::from_bits(caps))
            .charset(charset)
            .status_flags(status)
            .build();
        let decoded = Handshake::decode(&original.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded.challenge(), challenge);
        prop_assert_eq!(decoded, original);
    }
}

// Property: capability halves recombine into the original mask
proptest! {
    #[test]
    fn prop_capability_halves(bits in any::<u32>()) {
        let caps = CapabilityFlags::from_bits(bits);
        prop_assert_eq!(CapabilityFlags::from_halves(caps.low(), caps.high()), caps);
    }
}

// Property: negotiation never grants a flag the server did not offer
proptest! {
    #[test]
    fn prop_negotiation_is_subset(
        server_bits in any::<u32>(),
        multi in any::<bool>(),
        found in any::<bool>(),
        db in any::<bool>(),
    ) {
        let server = CapabilityFlags::from_bits(server_bits)
            | CapabilityFlags::PROTOCOL_41
            | CapabilityFlags::PLUGIN_AUTH;
        let config = ClientConfig {
            multi_statements: multi,
            found_rows: found,
            ..ClientConfig::default()
        };
        let caps = negotiate(server, &config, db).unwrap();
        prop_assert_eq!(caps & server, caps);
        prop_assert!(caps.contains(CapabilityFlags::PROTOCOL_41));
        prop_assert_eq!(
            caps.contains(CapabilityFlags::CONNECT_WITH_DB),
            db && server.contains(CapabilityFlags::CONNECT_WITH_DB)
        );
    }
}

// Property: scrambling is deterministic and sized by plugin
proptest! {
    #[test]
    fn prop_scramble_deterministic(
        password in prop::collection::vec(any::<u8>(), 0..128),
        challenge in prop::collection::vec(any::<u8>(), 20),
    ) {
        let a = scramble(&password, &challenge).unwrap();
        let b = scramble(&password, &challenge).unwrap();
        prop_assert_eq!(a, b);

        let n1 = scramble_native(&password, &challenge).unwrap();
        let n2 = scramble_native(&password, &challenge).unwrap();
        prop_assert_eq!(n1, n2);
    }
}

// Property: different challenges give different tokens
proptest! {
    #[test]
    fn prop_scramble_challenge_sensitive(
        password in prop::collection::vec(any::<u8>(), 1..64),
        challenge in prop::collection::vec(any::<u8>(), 20),
        index in 0usize..20,
    ) {
        let mut other = challenge.clone();
        other[index] ^= 0x01;
        prop_assert_ne!(
            scramble(&password, &challenge).unwrap(),
            scramble(&password, &other).unwrap()
        );
    }
}

// Property: any challenge length other than 20 is rejected
proptest! {
    #[test]
    fn prop_scramble_rejects_bad_length(len in (0usize..64).prop_filter("not 20", |l| *l != 20)) {
        let challenge = vec![0x5A; len];
        prop_assert!(scramble(b"pw", &challenge).is_err());
        prop_assert!(scramble_native(b"pw", &challenge).is_err());
    }
}

// Property: length-encoded integers read back what was written
proptest! {
    #[test]
    fn prop_lenenc_int(values in prop::collection::vec(any::<u64>(), 1..32)) {
        let mut enc = FieldEncoder::new();
        for v in &values {
            enc.put_lenenc_int(*v);
        }
        let packet = enc.finish(0).unwrap();
        let mut dec = FieldDecoder::new(packet.payload());
        for v in &values {
            prop_assert_eq!(dec.read_lenenc_int("value").unwrap(), *v);
        }
        prop_assert!(dec.is_empty());
    }
}

// Property: the client response survives a server-side decode
proptest! {
    #[test]
    fn prop_response_decodes_server_side(
        user in "[a-z_]{1,16}",
        password in "[ -~]{0,32}",
        db in proptest::option::of("[a-z]{1,12}"),
        challenge in challenge_strategy(),
    ) {
        let hs = Handshake::builder().challenge(&challenge).build();
        let mut creds = Credentials::new(user.clone(), password);
        if let Some(db) = &db {
            creds = creds.with_database(db.clone());
        }
        let response = HandshakeResponse::for_handshake(&hs, &creds, &ClientConfig::default()).unwrap();
        let decoded = HandshakeResponse::decode(&response.encode(1).unwrap()).unwrap();

        prop_assert_eq!(decoded.username, user);
        prop_assert_eq!(decoded.database, db);
        prop_assert_eq!(decoded.auth_response.as_bytes(), response.auth_response.as_bytes());
    }
}

// Property: auth reply classification never panics
proptest! {
    #[test]
    fn prop_auth_reply_never_panics(body in prop::collection::vec(any::<u8>(), 0..128)) {
        let packet = Packet::new(2, &body).unwrap();
        let _ = AuthReply::decode(&packet);
    }
}
