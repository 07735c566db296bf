//! MySQL packet framing.
//!
//! ```text
//! [Length(3, LE)] [Sequence(1)] [Body(Length)]
//! ```
//!
//! A `Packet` keeps the header and body together in a single `Bytes` buffer, so the
//! handshake decoder can be handed exactly what came off the wire.

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::{constants, ProtocolError, Result};

/// Size of the length + sequence header
pub const HEADER_LEN: usize = 4;

/// One length-prefixed frame, header included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    frame: Bytes,
}

impl Packet {
    /// Build a frame around `payload` with the given sequence id
    pub fn new(sequence_id: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(payload.len()));
        }
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
        put_header(&mut buf, payload.len(), sequence_id);
        buf.put_slice(payload);
        Ok(Self {
            frame: buf.freeze(),
        })
    }

    /// Wrap a complete frame. The declared length must match the body exactly.
    pub fn from_bytes(frame: impl Into<Bytes>) -> Result<Self> {
        let frame = frame.into();
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedFrame {
                field: "header",
                needed: HEADER_LEN,
                remaining: frame.len(),
            });
        }
        let declared = payload_len(&frame);
        if declared != frame.len() - HEADER_LEN {
            return Err(ProtocolError::malformed(
                "header",
                format!(
                    "{} (declared {declared}, body {})",
                    constants::ERR_LENGTH_MISMATCH,
                    frame.len() - HEADER_LEN
                ),
            ));
        }
        Ok(Self { frame })
    }

    /// Body length as declared by the 24-bit header
    pub fn payload_len(&self) -> usize {
        payload_len(&self.frame)
    }

    pub fn sequence_id(&self) -> u8 {
        self.frame[3]
    }

    /// Body without the header (zero-copy)
    pub fn payload(&self) -> Bytes {
        self.frame.slice(HEADER_LEN..)
    }

    /// Header and body as received or encoded
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame
    }

    pub fn into_bytes(self) -> Bytes {
        self.frame
    }
}

/// Decode the 24-bit little-endian body length from a header
#[inline]
pub(crate) fn payload_len(header: &[u8]) -> usize {
    (header[0] as usize) | (header[1] as usize) << 8 | (header[2] as usize) << 16
}

#[inline]
pub(crate) fn put_header(buf: &mut BytesMut, len: usize, sequence_id: u8) {
    buf.put_uint_le(len as u64, 3);
    buf.put_u8(sequence_id);
}
