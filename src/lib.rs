//! # mysql-handshake
//!
//! The connection phase of a MySQL protocol 10 client: frame reading, server
//! greeting decoding, password scrambling and the capability-negotiation response.
//!
//! ## Layers
//! - [`core`]: length-prefixed frames, exact reads, field cursor
//! - [`protocol`]: greeting, capabilities, scramble, response, auth replies
//! - [`service`]: async client that drives the whole exchange
//! - [`config`], [`error`], [`utils`]: settings, errors, logging and deadlines
//!
//! ## Example
//! ```rust,no_run
//! use mysql_handshake::config::ClientConfig;
//! use mysql_handshake::protocol::credentials::Credentials;
//! use mysql_handshake::service::HandshakeClient;
//!
//! # async fn run() -> mysql_handshake::error::Result<()> {
//! let client = HandshakeClient::new(ClientConfig::default());
//! let session = client.connect(&Credentials::new("root", "secret")).await?;
//! println!("connected to {}", session.handshake.server_version());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use error::{ProtocolError, Result};
pub use protocol::capabilities::CapabilityFlags;
pub use protocol::credentials::Credentials;
pub use protocol::handshake::Handshake;
pub use protocol::scramble::{scramble, AuthPlugin, AuthToken};
