//! Server greeting (Protocol::HandshakeV10) decoding.
//!
//! The greeting is the first frame a server sends on a new connection. It carries the
//! server's identity, its capability flags, and the 20-byte challenge the client must
//! scramble its password against.
//!
//! ```text
//! protocol_version(1) server_version(NUL) thread_id(4) salt1(8) filler(1)
//! caps_low(2) charset(1) status(2) caps_high(2) auth_data_len(1) reserved(10)
//! salt2(NUL, <= 12 bytes) auth_plugin_name(NUL)
//! ```
//!
//! Decoding is strict: a field that runs past the frame end fails with
//! `TruncatedFrame` naming that field, and no defaults are substituted for
//! missing trailing fields.

use bytes::Bytes;
use tracing::debug;

use crate::config::PROTOCOL_VERSION;
use crate::core::field::{FieldDecoder, FieldEncoder};
use crate::core::packet::Packet;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::capabilities::CapabilityFlags;
use crate::protocol::reply::ServerError;
use crate::protocol::scramble::SCRAMBLE_LEN;

/// Length of the first challenge fragment
pub const SALT1_LEN: usize = 8;

/// Maximum length of the second challenge fragment, terminator excluded
pub const SALT2_MAX_LEN: usize = SCRAMBLE_LEN - SALT1_LEN;

const RESERVED_LEN: usize = 10;

/// Header byte of an ERR packet sent in place of a greeting
const ERR_HEADER: u8 = 0xFF;

/// Decoded server greeting. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    sequence_id: u8,
    protocol_version: u8,
    server_version: String,
    thread_id: u32,
    salt1: [u8; SALT1_LEN],
    salt2: Bytes,
    charset: u8,
    status_flags: u16,
    capabilities: CapabilityFlags,
    auth_plugin_name: String,
}

impl Handshake {
    /// Decode a greeting from a complete frame (header included)
    pub fn decode(packet: &Packet) -> Result<Self> {
        let mut dec = FieldDecoder::new(packet.clone().into_bytes());
        dec.skip(4, "header")?;

        if dec.peek_u8() == Some(ERR_HEADER) {
            let err = ServerError::decode(&mut dec)?;
            return Err(err.into());
        }

        let protocol_version = dec.read_u8("protocol_version")?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::malformed(
                "protocol_version",
                format!("{} {protocol_version}", constants::ERR_UNSUPPORTED_PROTOCOL),
            ));
        }

        let server_version = read_required_string(&mut dec, "server_version")?;
        let thread_id = dec.read_u32_le("thread_id")?;

        let mut salt1 = [0u8; SALT1_LEN];
        salt1.copy_from_slice(&dec.read_fixed(SALT1_LEN, "salt1")?);
        dec.skip(1, "filler")?;

        let caps_low = dec.read_u16_le("capabilities_low")?;
        let charset = dec.read_u8("charset")?;
        let status_flags = dec.read_u16_le("status_flags")?;
        let caps_high = dec.read_u16_le("capabilities_high")?;
        dec.skip(1, "auth_plugin_data_len")?;
        dec.skip(RESERVED_LEN, "reserved")?;

        let salt2 = dec.read_null_terminated("salt2").map_err(terminator_to_malformed)?;
        if salt2.len() > SALT2_MAX_LEN {
            return Err(ProtocolError::malformed(
                "salt2",
                format!("{} (got {})", constants::ERR_SALT2_TOO_LONG, salt2.len()),
            ));
        }

        let auth_plugin_name = read_required_string(&mut dec, "auth_plugin_name")?;

        let handshake = Self {
            sequence_id: packet.sequence_id(),
            protocol_version,
            server_version,
            thread_id,
            salt1,
            salt2,
            charset,
            status_flags,
            capabilities: CapabilityFlags::from_halves(caps_low, caps_high),
            auth_plugin_name,
        };

        debug!(
            server_version = %handshake.server_version,
            thread_id = handshake.thread_id,
            capabilities = ?handshake.capabilities,
            auth_plugin = %handshake.auth_plugin_name,
            "Decoded server handshake"
        );

        Ok(handshake)
    }

    /// Encode this greeting as the server would send it
    pub fn encode(&self) -> Result<Packet> {
        let auth_data_len =
            u8::try_from(SALT1_LEN + self.salt2.len() + 1).map_err(|_| ProtocolError::Encode {
                field: "auth_plugin_data_len",
                reason: constants::ERR_AUTH_DATA_TOO_LONG,
            })?;

        let mut enc = FieldEncoder::with_capacity(64 + self.server_version.len());
        enc.put_u8(self.protocol_version)
            .put_null_terminated(self.server_version.as_bytes(), "server_version")?
            .put_u32_le(self.thread_id)
            .put_fixed(&self.salt1)
            .put_u8(0)
            .put_u16_le(self.capabilities.low())
            .put_u8(self.charset)
            .put_u16_le(self.status_flags)
            .put_u16_le(self.capabilities.high())
            .put_u8(auth_data_len)
            .put_zeros(RESERVED_LEN)
            .put_null_terminated(&self.salt2, "salt2")?
            .put_null_terminated(self.auth_plugin_name.as_bytes(), "auth_plugin_name")?;
        enc.finish(self.sequence_id)
    }

    pub fn builder() -> HandshakeBuilder {
        HandshakeBuilder::default()
    }

    /// Sequence id of the frame the greeting arrived in
    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }

    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Connection (thread) id assigned by the server
    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn salt1(&self) -> &[u8; SALT1_LEN] {
        &self.salt1
    }

    pub fn salt2(&self) -> &[u8] {
        &self.salt2
    }

    /// Full challenge: salt1 followed by salt2
    pub fn challenge(&self) -> Vec<u8> {
        let mut challenge = Vec::with_capacity(SALT1_LEN + self.salt2.len());
        challenge.extend_from_slice(&self.salt1);
        challenge.extend_from_slice(&self.salt2);
        challenge
    }

    pub fn charset(&self) -> u8 {
        self.charset
    }

    pub fn status_flags(&self) -> u16 {
        self.status_flags
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    pub fn auth_plugin_name(&self) -> &str {
        &self.auth_plugin_name
    }
}

/// NUL-terminated text that must be present; a missing terminator is structural
fn read_required_string(dec: &mut FieldDecoder, field: &'static str) -> Result<String> {
    dec.read_null_terminated_string(field)
        .map_err(terminator_to_malformed)
}

fn terminator_to_malformed(err: ProtocolError) -> ProtocolError {
    match err {
        ProtocolError::TruncatedFrame { field, .. } => {
            ProtocolError::malformed(field, constants::ERR_MISSING_TERMINATOR)
        }
        other => other,
    }
}

/// Builds greetings for test servers and tooling
#[derive(Debug, Clone)]
pub struct HandshakeBuilder {
    inner: Handshake,
}

impl Default for HandshakeBuilder {
    fn default() -> Self {
        Self {
            inner: Handshake {
                sequence_id: 0,
                protocol_version: PROTOCOL_VERSION,
                server_version: String::from("8.0.36"),
                thread_id: 1,
                salt1: *b"GbT7pXq2",
                salt2: Bytes::from_static(b"wR4zLm9sKd1e"),
                charset: 0xFF,
                status_flags: 0x0002,
                capabilities: CapabilityFlags::DEFAULT_CLIENT
                    | CapabilityFlags::CONNECT_WITH_DB
                    | CapabilityFlags::MULTI_STATEMENTS
                    | CapabilityFlags::FOUND_ROWS
                    | CapabilityFlags::DEPRECATE_EOF,
                auth_plugin_name: String::from("caching_sha2_password"),
            },
        }
    }
}

impl HandshakeBuilder {
    pub fn sequence_id(mut self, sequence_id: u8) -> Self {
        self.inner.sequence_id = sequence_id;
        self
    }

    pub fn server_version(mut self, version: impl Into<String>) -> Self {
        self.inner.server_version = version.into();
        self
    }

    pub fn thread_id(mut self, thread_id: u32) -> Self {
        self.inner.thread_id = thread_id;
        self
    }

    /// Split a challenge into salt1 (first 8 bytes) and salt2 (the rest).
    /// A challenge shorter than 8 bytes leaves the tail of salt1 zeroed and salt2 empty.
    /// Servers never put 0x00 in a challenge; `encode` rejects one in salt2.
    pub fn challenge(mut self, challenge: &[u8]) -> Self {
        let split = challenge.len().min(SALT1_LEN);
        self.inner.salt1 = [0u8; SALT1_LEN];
        self.inner.salt1[..split].copy_from_slice(&challenge[..split]);
        self.inner.salt2 = Bytes::copy_from_slice(&challenge[split..]);
        self
    }

    pub fn charset(mut self, charset: u8) -> Self {
        self.inner.charset = charset;
        self
    }

    pub fn status_flags(mut self, status: u16) -> Self {
        self.inner.status_flags = status;
        self
    }

    pub fn capabilities(mut self, capabilities: CapabilityFlags) -> Self {
        self.inner.capabilities = capabilities;
        self
    }

    pub fn auth_plugin_name(mut self, name: impl Into<String>) -> Self {
        self.inner.auth_plugin_name = name.into();
        self
    }

    pub fn build(self) -> Handshake {
        self.inner
    }
}
