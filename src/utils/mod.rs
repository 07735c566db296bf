//! # Utility Modules
//!
//! Supporting utilities shared by the framing and client layers.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup from `LoggingConfig`
//! - **Timeout**: deadline wrapper that reports expiry as a connection error

pub mod logging;
pub mod timeout;
