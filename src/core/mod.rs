//! # Core Framing Components
//!
//! Low-level frame handling: reading, writing, and field-level decoding.
//!
//! ## Components
//! - **Packet**: one length-prefixed frame, header included
//! - **Reader**: exact-length frame reads over an async stream
//! - **Codec**: Tokio codec for `Framed` byte streams
//! - **Field**: bounded cursor for decoding frame bodies, and its encoding mirror
//!
//! ## Wire Format
//! ```text
//! [Length(3, LE)] [Sequence(1)] [Body(Length)]
//! ```
//!
//! ## Limits
//! - Maximum body size: 0xFF_FFFF bytes (single 3-byte length, no continuation frames)
//! - Short reads are errors, never partial frames

pub mod codec;
pub mod field;
pub mod packet;
pub mod reader;
