//! # Error Types
//!
//! Error handling for the handshake core.
//!
//! Every failure is surfaced synchronously from the operation that produced it.
//! Nothing in this crate retries: a failed read or decode is fatal to the current
//! handshake attempt, and reconnect policy belongs to the caller.
//!
//! ## Error Categories
//! - **Transport**: I/O failures and timeouts (`Connection`), early stream close (`ShortRead`)
//! - **Decoding**: fields running past the frame (`TruncatedFrame`), structural
//!   violations in the server greeting (`MalformedHandshake`)
//! - **Authentication**: bad scramble input, unsupported plugins, server refusals
//! - **Configuration**: invalid or unreadable settings
//!
//! ## Example Usage
//! ```rust
//! use mysql_handshake::error::ProtocolError;
//! use mysql_handshake::protocol::scramble::scramble;
//! use tracing::error;
//!
//! match scramble(b"secret", &[0u8; 8]) {
//!     Err(ProtocolError::ScrambleInput { expected, actual }) => {
//!         error!(expected, actual, "challenge has the wrong length");
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::borrow::Cow;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Decoding errors
    pub const ERR_MISSING_TERMINATOR: &str = "missing NUL terminator";
    pub const ERR_INVALID_UTF8: &str = "string is not valid UTF-8";
    pub const ERR_UNSUPPORTED_PROTOCOL: &str = "unsupported protocol version";
    pub const ERR_SALT2_TOO_LONG: &str = "challenge remainder exceeds 12 bytes";
    pub const ERR_LENGTH_MISMATCH: &str = "declared length does not match frame body";

    /// Encoding errors
    pub const ERR_INTERIOR_NUL: &str = "value contains a NUL byte";
    pub const ERR_AUTH_RESPONSE_TOO_LONG: &str = "auth response exceeds 255 bytes";
    pub const ERR_AUTH_DATA_TOO_LONG: &str = "challenge exceeds 254 bytes";

    /// Transport errors
    pub const ERR_READ_TIMEOUT: &str = "timed out waiting for server packet";
    pub const ERR_CONNECT_TIMEOUT: &str = "timed out connecting to server";

    /// Negotiation errors
    pub const ERR_NO_PROTOCOL_41: &str = "server does not support protocol 4.1";
    pub const ERR_NO_PLUGIN_AUTH: &str = "server does not support pluggable authentication";
    pub const ERR_FULL_AUTH_REQUIRED: &str =
        "server requires full authentication, which needs a secure transport";
    pub const ERR_REPEATED_AUTH_SWITCH: &str = "server requested a second auth switch";
}

/// ProtocolError is the error type for every operation in the crate
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Transport failure, including read deadlines (`io::ErrorKind::TimedOut`)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    #[error("Short read: expected {expected} bytes, stream closed after {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Truncated frame while reading `{field}`: needed {needed} bytes, {remaining} remaining")]
    TruncatedFrame {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Malformed handshake at `{field}`: {reason}")]
    MalformedHandshake {
        field: &'static str,
        reason: Cow<'static, str>,
    },

    #[error("Scramble input error: challenge must be {expected} bytes, got {actual}")]
    ScrambleInput { expected: usize, actual: usize },

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Cannot encode `{field}`: {reason}")]
    Encode {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Server error {code} ({state}): {message}")]
    Server {
        code: u16,
        state: String,
        message: String,
    },

    #[error("Unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(&'static str),

    #[error("Unexpected packet with header byte 0x{0:02X}")]
    UnexpectedPacket(u8),

    #[error("Packet out of order: expected sequence id {expected}, got {actual}")]
    OutOfOrder { expected: u8, actual: u8 },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Build a `Connection` error of kind `TimedOut`
    pub fn timeout(context: &'static str) -> Self {
        ProtocolError::Connection(io::Error::new(io::ErrorKind::TimedOut, context))
    }

    /// Whether this error is a transport deadline expiring
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Connection(e) if e.kind() == io::ErrorKind::TimedOut)
    }

    /// Name of the frame field this error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ProtocolError::TruncatedFrame { field, .. }
            | ProtocolError::MalformedHandshake { field, .. }
            | ProtocolError::Encode { field, .. } => Some(field),
            _ => None,
        }
    }

    pub(crate) fn malformed(field: &'static str, reason: impl Into<Cow<'static, str>>) -> Self {
        ProtocolError::MalformedHandshake {
            field,
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
