//! Handshake client: drives the connection phase over any async byte stream.
//!
//! ```text
//! server greeting -> decode -> scramble + negotiate -> HandshakeResponse41
//!                 -> OK | ERR | AuthSwitchRequest | AuthMoreData
//! ```
//!
//! The transport is supplied by the caller (`handshake`) or opened here as a plain
//! TCP stream (`connect`). TLS upgrade and the command phase are out of scope.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::core::codec::PacketCodec;
use crate::core::packet::Packet;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::capabilities::CapabilityFlags;
use crate::protocol::credentials::Credentials;
use crate::protocol::handshake::Handshake;
use crate::protocol::reply::{AuthReply, FAST_AUTH_SUCCESS, FULL_AUTH_REQUIRED};
use crate::protocol::response::HandshakeResponse;
use crate::protocol::scramble::AuthPlugin;
use crate::utils::timeout::with_timeout;

/// An authenticated connection, ready for the command phase
#[derive(Debug)]
pub struct Session<S> {
    pub handshake: Handshake,
    pub capabilities: CapabilityFlags,
    pub stream: S,
}

/// Connection-phase driver
#[derive(Debug, Clone, Default)]
pub struct HandshakeClient {
    config: ClientConfig,
}

impl HandshakeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a TCP connection to the configured address and authenticate
    #[instrument(skip(self, credentials), fields(address = %self.config.address))]
    pub async fn connect(&self, credentials: &Credentials) -> Result<Session<TcpStream>> {
        let stream = with_timeout(
            self.config.connect_timeout,
            constants::ERR_CONNECT_TIMEOUT,
            async {
                TcpStream::connect(&self.config.address)
                    .await
                    .map_err(ProtocolError::from)
            },
        )
        .await?;
        stream.set_nodelay(true)?;
        self.handshake(stream, credentials).await
    }

    /// Run the connection phase over an already-open stream
    #[instrument(skip(self, stream, credentials), fields(user = %credentials.username()))]
    pub async fn handshake<S>(&self, stream: S, credentials: &Credentials) -> Result<Session<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, PacketCodec::new());

        let greeting = self.next_packet(&mut framed).await?;
        let handshake = Handshake::decode(&greeting)?;

        let response = HandshakeResponse::for_handshake(&handshake, credentials, &self.config)?;
        let capabilities = response.capabilities;
        let mut sequence_id = handshake.sequence_id().wrapping_add(1);
        framed.send(response.encode(sequence_id)?).await?;

        let mut switched = false;
        loop {
            let packet = self.next_packet(&mut framed).await?;
            let expected = sequence_id.wrapping_add(1);
            if packet.sequence_id() != expected {
                return Err(ProtocolError::OutOfOrder {
                    expected,
                    actual: packet.sequence_id(),
                });
            }
            sequence_id = expected;

            match AuthReply::decode(&packet)? {
                AuthReply::Ok => {
                    debug!(thread_id = handshake.thread_id(), "Authenticated");
                    break;
                }
                AuthReply::Err(err) => {
                    warn!(code = err.code, state = %err.state, "Server rejected authentication");
                    return Err(err.into());
                }
                AuthReply::AuthSwitch { plugin, challenge } => {
                    if switched {
                        return Err(ProtocolError::UnsupportedCapability(
                            constants::ERR_REPEATED_AUTH_SWITCH,
                        ));
                    }
                    switched = true;
                    let plugin: AuthPlugin = plugin.parse()?;
                    debug!(plugin = %plugin, "Server requested auth switch");
                    let token = plugin.auth_response(credentials.password(), &challenge)?;
                    sequence_id = sequence_id.wrapping_add(1);
                    framed
                        .send(Packet::new(sequence_id, token.as_bytes())?)
                        .await?;
                }
                AuthReply::MoreData(data) => match data.first() {
                    Some(&FAST_AUTH_SUCCESS) => debug!("Fast authentication succeeded"),
                    Some(&FULL_AUTH_REQUIRED) => {
                        return Err(ProtocolError::UnsupportedCapability(
                            constants::ERR_FULL_AUTH_REQUIRED,
                        ));
                    }
                    Some(&other) => return Err(ProtocolError::UnexpectedPacket(other)),
                    None => {
                        return Err(ProtocolError::TruncatedFrame {
                            field: "auth_more_data",
                            needed: 1,
                            remaining: 0,
                        })
                    }
                },
            }
        }

        Ok(Session {
            handshake,
            capabilities,
            stream: framed.into_inner(),
        })
    }

    async fn next_packet<S>(&self, framed: &mut Framed<S, PacketCodec>) -> Result<Packet>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        with_timeout(
            self.config.read_timeout,
            constants::ERR_READ_TIMEOUT,
            async {
                match framed.next().await {
                    Some(packet) => packet,
                    None => Err(ProtocolError::ShortRead {
                        expected: crate::core::packet::HEADER_LEN,
                        received: 0,
                    }),
                }
            },
        )
        .await
    }
}
