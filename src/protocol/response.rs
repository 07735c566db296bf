//! Client handshake response (Protocol::HandshakeResponse41) and capability negotiation.
//!
//! ```text
//! capabilities(4) max_packet_size(4) charset(1) reserved(23)
//! username(NUL) auth_response(lenenc | len(1) | NUL) [database(NUL)] [plugin(NUL)]
//! ```

use tracing::debug;

use crate::config::ClientConfig;
use crate::core::field::{FieldDecoder, FieldEncoder};
use crate::core::packet::Packet;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::capabilities::CapabilityFlags;
use crate::protocol::credentials::Credentials;
use crate::protocol::handshake::Handshake;
use crate::protocol::scramble::{AuthPlugin, AuthToken};

const RESERVED_LEN: usize = 23;

/// Client capability flags for this connection.
///
/// Starts from [`CapabilityFlags::DEFAULT_CLIENT`], adds optional features from the
/// config, and keeps only what the server also advertises. Protocol 4.1 and
/// pluggable auth are mandatory.
pub fn negotiate(
    server: CapabilityFlags,
    config: &ClientConfig,
    with_database: bool,
) -> Result<CapabilityFlags> {
    if !server.contains(CapabilityFlags::PROTOCOL_41) {
        return Err(ProtocolError::UnsupportedCapability(
            constants::ERR_NO_PROTOCOL_41,
        ));
    }
    if !server.contains(CapabilityFlags::PLUGIN_AUTH) {
        return Err(ProtocolError::UnsupportedCapability(
            constants::ERR_NO_PLUGIN_AUTH,
        ));
    }

    let mut wanted = CapabilityFlags::DEFAULT_CLIENT;
    wanted.set(CapabilityFlags::CONNECT_WITH_DB, with_database);
    wanted.set(CapabilityFlags::MULTI_STATEMENTS, config.multi_statements);
    wanted.set(CapabilityFlags::FOUND_ROWS, config.found_rows);

    let negotiated = wanted & server;
    debug!(client = ?wanted, negotiated = ?negotiated, "Negotiated capabilities");
    Ok(negotiated)
}

/// HandshakeResponse41 fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub capabilities: CapabilityFlags,
    pub max_packet_size: u32,
    pub charset: u8,
    pub username: String,
    pub auth_response: AuthToken,
    pub database: Option<String>,
    pub auth_plugin: Option<String>,
}

impl HandshakeResponse {
    /// Build the response to `handshake`: pick the plugin the server named, scramble
    /// the password against its challenge, and negotiate capabilities.
    pub fn for_handshake(
        handshake: &Handshake,
        credentials: &Credentials,
        config: &ClientConfig,
    ) -> Result<Self> {
        let plugin: AuthPlugin = handshake.auth_plugin_name().parse()?;
        let auth_response = plugin.auth_response(credentials.password(), &handshake.challenge())?;
        let capabilities = negotiate(
            handshake.capabilities(),
            config,
            credentials.database().is_some(),
        )?;

        Ok(Self {
            capabilities,
            max_packet_size: config.max_packet_size,
            charset: config.charset,
            username: credentials.username().to_string(),
            auth_response,
            database: credentials.database().map(str::to_string),
            auth_plugin: Some(plugin.as_str().to_string()),
        })
    }

    pub fn encode(&self, sequence_id: u8) -> Result<Packet> {
        let caps = self.capabilities;
        let token = self.auth_response.as_bytes();

        let mut enc = FieldEncoder::with_capacity(64 + self.username.len() + token.len());
        enc.put_u32_le(caps.bits())
            .put_u32_le(self.max_packet_size)
            .put_u8(self.charset)
            .put_zeros(RESERVED_LEN)
            .put_null_terminated(self.username.as_bytes(), "username")?;

        if caps.contains(CapabilityFlags::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
            enc.put_lenenc_bytes(token);
        } else if caps.contains(CapabilityFlags::SECURE_CONNECTION) {
            let len = u8::try_from(token.len()).map_err(|_| ProtocolError::Encode {
                field: "auth_response",
                reason: constants::ERR_AUTH_RESPONSE_TOO_LONG,
            })?;
            enc.put_u8(len).put_fixed(token);
        } else {
            enc.put_null_terminated(token, "auth_response")?;
        }

        // the field is positional once the flag is set; no database is sent as ""
        if caps.contains(CapabilityFlags::CONNECT_WITH_DB) {
            let database = self.database.as_deref().unwrap_or_default();
            enc.put_null_terminated(database.as_bytes(), "database")?;
        }
        if caps.contains(CapabilityFlags::PLUGIN_AUTH) {
            if let Some(plugin) = &self.auth_plugin {
                enc.put_null_terminated(plugin.as_bytes(), "auth_plugin_name")?;
            }
        }

        enc.finish(sequence_id)
    }

    /// Decode a response frame, as a server would
    pub fn decode(packet: &Packet) -> Result<Self> {
        let mut dec = FieldDecoder::new(packet.payload());
        let capabilities = CapabilityFlags::from_bits(dec.read_u32_le("capabilities")?);
        let max_packet_size = dec.read_u32_le("max_packet_size")?;
        let charset = dec.read_u8("charset")?;
        dec.skip(RESERVED_LEN, "reserved")?;
        let username = dec.read_null_terminated_string("username")?;

        let auth_response = if capabilities.contains(CapabilityFlags::PLUGIN_AUTH_LENENC_CLIENT_DATA)
        {
            let len = dec.read_lenenc_int("auth_response")? as usize;
            dec.read_fixed(len, "auth_response")?.to_vec()
        } else if capabilities.contains(CapabilityFlags::SECURE_CONNECTION) {
            let len = dec.read_u8("auth_response")? as usize;
            dec.read_fixed(len, "auth_response")?.to_vec()
        } else {
            dec.read_null_terminated("auth_response")?.to_vec()
        };

        let database = if capabilities.contains(CapabilityFlags::CONNECT_WITH_DB) && !dec.is_empty()
        {
            Some(dec.read_null_terminated_string("database")?).filter(|db| !db.is_empty())
        } else {
            None
        };
        let auth_plugin = if capabilities.contains(CapabilityFlags::PLUGIN_AUTH) && !dec.is_empty() {
            Some(dec.read_null_terminated_string("auth_plugin_name")?)
        } else {
            None
        };

        Ok(Self {
            capabilities,
            max_packet_size,
            charset,
            username,
            auth_response: AuthToken::from(auth_response),
            database,
            auth_plugin,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server_caps() -> CapabilityFlags {
        Handshake::builder().build().capabilities()
    }

    #[test]
    fn negotiate_requires_protocol_41() {
        let server = server_caps() & !CapabilityFlags::PROTOCOL_41;
        assert!(matches!(
            negotiate(server, &ClientConfig::default(), false),
            Err(ProtocolError::UnsupportedCapability(_))
        ));
    }

    #[test]
    fn negotiate_requires_plugin_auth() {
        let server = server_caps() & !CapabilityFlags::PLUGIN_AUTH;
        assert!(negotiate(server, &ClientConfig::default(), false).is_err());
    }

    #[test]
    fn negotiate_intersects_with_server() {
        let server = CapabilityFlags::PROTOCOL_41
            | CapabilityFlags::PLUGIN_AUTH
            | CapabilityFlags::SECURE_CONNECTION
            | CapabilityFlags::SSL;
        let caps = negotiate(server, &ClientConfig::default(), true).unwrap();
        assert_eq!(
            caps,
            CapabilityFlags::PROTOCOL_41
                | CapabilityFlags::PLUGIN_AUTH
                | CapabilityFlags::SECURE_CONNECTION
        );
        // never volunteered
        assert!(!caps.contains(CapabilityFlags::SSL));
    }

    #[test]
    fn negotiate_optional_flags() {
        let config = ClientConfig {
            multi_statements: true,
            ..ClientConfig::default()
        };
        let caps = negotiate(server_caps(), &config, true).unwrap();
        assert!(caps.contains(CapabilityFlags::MULTI_STATEMENTS));
        assert!(caps.contains(CapabilityFlags::CONNECT_WITH_DB));
        assert!(!caps.contains(CapabilityFlags::FOUND_ROWS));
    }

    #[test]
    fn auth_response_framing_follows_capabilities() {
        let base = HandshakeResponse {
            capabilities: CapabilityFlags::PROTOCOL_41,
            max_packet_size: 1 << 24,
            charset: 0xFF,
            username: "root".into(),
            auth_response: AuthToken::from(vec![0xAB; 20]),
            database: None,
            auth_plugin: None,
        };
        let auth_offset = 4 + 4 + 1 + RESERVED_LEN + 5;

        let lenenc = HandshakeResponse {
            capabilities: base.capabilities | CapabilityFlags::PLUGIN_AUTH_LENENC_CLIENT_DATA,
            ..base.clone()
        };
        let frame = lenenc.encode(1).unwrap().payload();
        assert_eq!(frame[auth_offset], 20);
        assert_eq!(frame.len(), auth_offset + 1 + 20);

        let secure = HandshakeResponse {
            capabilities: base.capabilities | CapabilityFlags::SECURE_CONNECTION,
            ..base.clone()
        };
        let frame = secure.encode(1).unwrap().payload();
        assert_eq!(frame[auth_offset], 20);

        let plain = base.encode(1).unwrap().payload();
        assert_eq!(plain.len(), auth_offset + 20 + 1);
        assert_eq!(plain[plain.len() - 1], 0);

        for response in [lenenc, secure, base] {
            let packet = response.encode(1).unwrap();
            assert_eq!(HandshakeResponse::decode(&packet).unwrap(), response);
        }
    }

    #[test]
    fn encode_layout() {
        let response = HandshakeResponse {
            capabilities: CapabilityFlags::DEFAULT_CLIENT | CapabilityFlags::CONNECT_WITH_DB,
            max_packet_size: 0x0100_0000,
            charset: 0x21,
            username: "app".into(),
            auth_response: AuthToken::from(vec![1, 2, 3]),
            database: Some("shop".into()),
            auth_plugin: Some("caching_sha2_password".into()),
        };
        let packet = response.encode(1).unwrap();
        assert_eq!(packet.sequence_id(), 1);

        let body = packet.payload();
        assert_eq!(
            &body[..4],
            &(CapabilityFlags::DEFAULT_CLIENT | CapabilityFlags::CONNECT_WITH_DB)
                .bits()
                .to_le_bytes()
        );
        assert_eq!(&body[4..8], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(body[8], 0x21);
        assert!(body[9..32].iter().all(|&b| b == 0));
        assert_eq!(&body[32..36], b"app\0");
        assert_eq!(&body[36..40], &[3, 1, 2, 3]);
        assert_eq!(&body[40..45], b"shop\0");
        assert_eq!(&body[45..], b"caching_sha2_password\0");
    }

    #[test]
    fn database_omitted_without_capability() {
        let response = HandshakeResponse {
            capabilities: CapabilityFlags::DEFAULT_CLIENT,
            max_packet_size: 0,
            charset: 0x21,
            username: "app".into(),
            auth_response: AuthToken::empty(),
            database: Some("shop".into()),
            auth_plugin: None,
        };
        let decoded = HandshakeResponse::decode(&response.encode(1).unwrap()).unwrap();
        assert_eq!(decoded.database, None);
    }

    #[test]
    fn database_flag_without_database_keeps_plugin_position() {
        let response = HandshakeResponse {
            capabilities: CapabilityFlags::DEFAULT_CLIENT | CapabilityFlags::CONNECT_WITH_DB,
            max_packet_size: 0x0100_0000,
            charset: 0xFF,
            username: "root".into(),
            auth_response: AuthToken::from(vec![9; 32]),
            database: None,
            auth_plugin: Some("caching_sha2_password".into()),
        };
        let packet = response.encode(1).unwrap();

        let body = packet.payload();
        // username(5) + lenenc token(33) + empty database(1) after the fixed 32 bytes
        assert_eq!(body[32 + 5 + 33], 0);
        assert_eq!(&body[32 + 5 + 33 + 1..], b"caching_sha2_password\0");

        let decoded = HandshakeResponse::decode(&packet).unwrap();
        assert_eq!(decoded.database, None);
        assert_eq!(decoded.auth_plugin.as_deref(), Some("caching_sha2_password"));
        assert_eq!(decoded, response);
    }
}
