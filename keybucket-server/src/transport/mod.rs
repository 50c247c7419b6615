//! Network transports for the rate limiting server
//!
//! - [`http`]: REST API with JSON payloads

pub mod http;
