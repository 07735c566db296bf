//! Tokio codec for MySQL frames, for use with `Framed` streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::packet::{payload_len, Packet, HEADER_LEN};
use crate::error::{ProtocolError, Result};

/// Splits a byte stream into [`Packet`]s and writes them back out
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    max_payload: usize,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }

    /// Reject frames whose declared body exceeds `max_payload`
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            max_payload: max_payload.min(MAX_PAYLOAD_SIZE),
        }
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let body_len = payload_len(&src[..HEADER_LEN]);
        if body_len > self.max_payload {
            return Err(ProtocolError::OversizedPacket(body_len));
        }

        let total = HEADER_LEN + body_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total).freeze();
        Packet::from_bytes(frame).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => {
                let expected = if src.len() < HEADER_LEN {
                    HEADER_LEN
                } else {
                    payload_len(&src[..HEADER_LEN])
                };
                let received = if src.len() < HEADER_LEN {
                    src.len()
                } else {
                    src.len() - HEADER_LEN
                };
                src.advance(src.len());
                Err(ProtocolError::ShortRead { expected, received })
            }
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<()> {
        if packet.payload_len() > self.max_payload {
            return Err(ProtocolError::OversizedPacket(packet.payload_len()));
        }
        dst.extend_from_slice(packet.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_header_waits() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&[5u8, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn two_frames_in_one_buffer() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Packet::new(0, b"ab").unwrap(), &mut buf).unwrap();
        codec.encode(Packet::new(1, b"c").unwrap(), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&first.payload()[..], b"ab");
        assert_eq!(second.sequence_id(), 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn eof_mid_body_is_short_read() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&[4u8, 0, 0, 0, 1, 2, 3][..]);
        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ShortRead {
                expected: 4,
                received: 3
            }
        ));
    }

    #[test]
    fn max_payload_enforced() {
        let mut codec = PacketCodec::with_max_payload(8);
        let mut buf = BytesMut::from(&[9u8, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedPacket(9))
        ));
    }
}
