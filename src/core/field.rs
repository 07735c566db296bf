//! Bounded field cursor over a frame body, and its encoding mirror.
//!
//! Every read names the field it is decoding. A read that would run past the end of
//! the buffer fails with [`ProtocolError::TruncatedFrame`] and leaves the cursor
//! where it was.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::core::packet::{put_header, Packet};
use crate::config::MAX_PAYLOAD_SIZE;
use crate::error::{constants, ProtocolError, Result};

/// Cursor over an owned frame buffer
#[derive(Debug, Clone)]
pub struct FieldDecoder {
    buf: Bytes,
    len: usize,
}

impl FieldDecoder {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        let buf = buf.into();
        Self {
            len: buf.len(),
            buf,
        }
    }

    /// Offset of the cursor from the start of the buffer
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Next byte without advancing
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    #[inline]
    fn ensure(&self, needed: usize, field: &'static str) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::TruncatedFrame {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(1, field)?;
        Ok(self.buf.get_u8())
    }

    /// Next `n` bytes, zero-copy
    pub fn read_fixed(&mut self, n: usize, field: &'static str) -> Result<Bytes> {
        self.ensure(n, field)?;
        Ok(self.buf.split_to(n))
    }

    pub fn skip(&mut self, n: usize, field: &'static str) -> Result<()> {
        self.ensure(n, field)?;
        self.buf.advance(n);
        Ok(())
    }

    /// Little-endian unsigned integer of `width` bytes (1..=8)
    pub fn read_uint_le(&mut self, width: usize, field: &'static str) -> Result<u64> {
        debug_assert!((1..=8).contains(&width));
        self.ensure(width, field)?;
        Ok(self.buf.get_uint_le(width))
    }

    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16> {
        Ok(self.read_uint_le(2, field)? as u16)
    }

    pub fn read_u24_le(&mut self, field: &'static str) -> Result<u32> {
        Ok(self.read_uint_le(3, field)? as u32)
    }

    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32> {
        Ok(self.read_uint_le(4, field)? as u32)
    }

    /// Bytes up to the next 0x00; the terminator is consumed but not returned
    pub fn read_null_terminated(&mut self, field: &'static str) -> Result<Bytes> {
        match self.buf.iter().position(|&b| b == 0) {
            Some(end) => {
                let value = self.buf.split_to(end);
                self.buf.advance(1);
                Ok(value)
            }
            None => Err(ProtocolError::TruncatedFrame {
                field,
                needed: self.buf.remaining() + 1,
                remaining: self.buf.remaining(),
            }),
        }
    }

    /// NUL-terminated text. Invalid UTF-8 is rejected rather than replaced.
    pub fn read_null_terminated_string(&mut self, field: &'static str) -> Result<String> {
        let raw = self.read_null_terminated(field)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| ProtocolError::malformed(field, constants::ERR_INVALID_UTF8))
    }

    /// Length-encoded integer: <0xFB one byte, 0xFC +2, 0xFD +3, 0xFE +8
    pub fn read_lenenc_int(&mut self, field: &'static str) -> Result<u64> {
        let first = self.read_u8(field)?;
        match first {
            0xFC => self.read_uint_le(2, field),
            0xFD => self.read_uint_le(3, field),
            0xFE => self.read_uint_le(8, field),
            0xFB | 0xFF => Err(ProtocolError::malformed(
                field,
                format!("invalid length-encoded integer prefix 0x{first:02X}"),
            )),
            n => Ok(n as u64),
        }
    }

    /// Everything left in the buffer
    pub fn read_rest(&mut self) -> Bytes {
        self.buf.split_off(0)
    }
}

/// Builder for a frame body, mirroring [`FieldDecoder`]
#[derive(Debug, Default)]
pub struct FieldEncoder {
    buf: BytesMut,
}

impl FieldEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn put_u16_le(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn put_u32_le(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn put_fixed(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_slice(value);
        self
    }

    pub fn put_zeros(&mut self, n: usize) -> &mut Self {
        self.buf.put_bytes(0, n);
        self
    }

    /// Value followed by 0x00. Interior NULs would shift every following field.
    pub fn put_null_terminated(&mut self, value: &[u8], field: &'static str) -> Result<&mut Self> {
        if value.contains(&0) {
            return Err(ProtocolError::Encode {
                field,
                reason: constants::ERR_INTERIOR_NUL,
            });
        }
        self.buf.put_slice(value);
        self.buf.put_u8(0);
        Ok(self)
    }

    pub fn put_lenenc_int(&mut self, value: u64) -> &mut Self {
        match value {
            0..=0xFA => self.buf.put_u8(value as u8),
            0xFB..=0xFFFF => {
                self.buf.put_u8(0xFC);
                self.buf.put_uint_le(value, 2);
            }
            0x1_0000..=0xFF_FFFF => {
                self.buf.put_u8(0xFD);
                self.buf.put_uint_le(value, 3);
            }
            _ => {
                self.buf.put_u8(0xFE);
                self.buf.put_u64_le(value);
            }
        }
        self
    }

    pub fn put_lenenc_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.put_lenenc_int(value.len() as u64);
        self.buf.put_slice(value);
        self
    }

    /// Prefix the body with a header and produce the frame
    pub fn finish(self, sequence_id: u8) -> Result<Packet> {
        let body_len = self.buf.len();
        if body_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(body_len));
        }
        let mut frame = BytesMut::with_capacity(body_len + 4);
        put_header(&mut frame, body_len, sequence_id);
        frame.extend_from_slice(&self.buf);
        Packet::from_bytes(frame.freeze())
    }
}
