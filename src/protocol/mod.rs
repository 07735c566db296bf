//! # Connection-Phase Protocol
//!
//! Message types and algorithms for the MySQL connection phase.
//!
//! ## Components
//! - **Handshake**: server greeting decoding (and encoding, for test servers)
//! - **Scramble**: password scrambling for `caching_sha2_password` and `mysql_native_password`
//! - **Capabilities**: the 32-bit capability bitmask
//! - **Response**: capability negotiation and the client handshake response
//! - **Reply**: OK / ERR / auth-switch / more-data replies after the response

pub mod capabilities;
pub mod credentials;
pub mod handshake;
pub mod reply;
pub mod response;
pub mod scramble;
