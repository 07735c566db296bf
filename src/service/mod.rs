//! # Service Layer
//!
//! Async drivers built on the framing and protocol modules.

pub mod client;

pub use client::{HandshakeClient, Session};
