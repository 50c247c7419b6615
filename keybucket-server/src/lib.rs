//! # keybucket server
//!
//! A standalone HTTP front end for the [`keybucket`] rate limiter. Every key
//! sent to the server gets its own token bucket with the capacity and refill
//! interval chosen at startup.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show all available options
//! keybucket --help
//!
//! # Burst of 20, one token every 500ms, on port 9090
//! keybucket --port 9090 --capacity 20 --refill-interval-ms 500
//!
//! # DashMap backend, sweep idle buckets every minute
//! keybucket --backend dashmap --eviction-interval 60
//!
//! # List all available environment variables
//! keybucket --list-env-vars
//! ```
//!
//! ## Usage
//!
//! ```bash
//! curl -X POST http://localhost:8080/consume \
//!   -H "Content-Type: application/json" \
//!   -d '{"key": "user:123", "quantity": 1}'
//! ```
//!
//! A `200` means the tokens were taken. A `429` carries a `Retry-After`
//! header with the number of seconds until the same request can succeed.
//!
//! See [`transport::http`] for the full API.

pub mod config;
pub mod limiter;
pub mod metrics;
pub mod transport;
pub mod types;
