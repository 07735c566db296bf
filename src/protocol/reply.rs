//! Server replies during the authentication phase.
//!
//! After the handshake response the server answers with one of:
//! - OK (`0x00`): authenticated
//! - ERR (`0xFF`): refused
//! - AuthSwitchRequest (`0xFE`): answer again with another plugin and challenge
//! - AuthMoreData (`0x01`): plugin-specific; for `caching_sha2_password`, `0x03` means
//!   the fast path succeeded and `0x04` means full authentication is required

use bytes::Bytes;

use crate::core::field::FieldDecoder;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};

const OK_HEADER: u8 = 0x00;
const MORE_DATA_HEADER: u8 = 0x01;
const AUTH_SWITCH_HEADER: u8 = 0xFE;
const ERR_HEADER: u8 = 0xFF;

/// `caching_sha2_password` fast-auth outcome bytes
pub const FAST_AUTH_SUCCESS: u8 = 0x03;
pub const FULL_AUTH_REQUIRED: u8 = 0x04;

/// ERR packet body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub code: u16,
    pub state: String,
    pub message: String,
}

impl ServerError {
    /// Decode from a cursor positioned on the 0xFF header byte
    pub fn decode(dec: &mut FieldDecoder) -> Result<Self> {
        let header = dec.read_u8("err_header")?;
        if header != ERR_HEADER {
            return Err(ProtocolError::UnexpectedPacket(header));
        }
        let code = dec.read_u16_le("error_code")?;
        let state = if dec.peek_u8() == Some(b'#') {
            dec.skip(1, "sql_state_marker")?;
            String::from_utf8_lossy(&dec.read_fixed(5, "sql_state")?).into_owned()
        } else {
            String::from("HY000")
        };
        let message = String::from_utf8_lossy(&dec.read_rest()).into_owned();
        Ok(Self {
            code,
            state,
            message,
        })
    }
}

impl From<ServerError> for ProtocolError {
    fn from(err: ServerError) -> Self {
        ProtocolError::Server {
            code: err.code,
            state: err.state,
            message: err.message,
        }
    }
}

/// Classified server reply to a handshake response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthReply {
    Ok,
    Err(ServerError),
    AuthSwitch { plugin: String, challenge: Bytes },
    MoreData(Bytes),
}

impl AuthReply {
    pub fn decode(packet: &Packet) -> Result<Self> {
        let mut dec = FieldDecoder::new(packet.payload());
        match dec.peek_u8() {
            Some(OK_HEADER) => Ok(AuthReply::Ok),
            Some(ERR_HEADER) => ServerError::decode(&mut dec).map(AuthReply::Err),
            Some(AUTH_SWITCH_HEADER) => {
                dec.skip(1, "auth_switch_header")?;
                let plugin = dec.read_null_terminated_string("auth_switch_plugin")?;
                let mut challenge = dec.read_rest();
                // the switch challenge carries a trailing NUL
                if challenge.last() == Some(&0) {
                    challenge.truncate(challenge.len() - 1);
                }
                Ok(AuthReply::AuthSwitch { plugin, challenge })
            }
            Some(MORE_DATA_HEADER) => {
                dec.skip(1, "more_data_header")?;
                Ok(AuthReply::MoreData(dec.read_rest()))
            }
            Some(other) => Err(ProtocolError::UnexpectedPacket(other)),
            None => Err(ProtocolError::TruncatedFrame {
                field: "reply_header",
                needed: 1,
                remaining: 0,
            }),
        }
    }
}
