//! Server configuration and CLI argument parsing
//!
//! Settings come from command-line arguments or environment variables with the
//! `KEYBUCKET_` prefix.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! keybucket --port 9090 --capacity 20 --refill-interval-ms 500
//!
//! # Using environment variables
//! export KEYBUCKET_PORT=9090
//! export KEYBUCKET_BACKEND=dashmap
//! keybucket
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use serde::Deserialize;

/// Main configuration structure for the server
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listener configuration
    pub http: HttpConfig,
    /// Bucket store configuration
    pub limiter: LimiterConfig,
    /// Longest accepted rate-limit key, in bytes
    pub max_key_len: usize,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Bucket store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LimiterConfig {
    /// Bucket map implementation
    pub backend: BackendType,
    /// Tokens per bucket (burst size)
    pub capacity: u64,
    /// Milliseconds to earn one token
    pub refill_interval_ms: u64,
    /// Shard count for the bucket map, `None` for the backend default
    pub shards: Option<usize>,
    /// Seconds between idle-bucket sweeps, 0 disables eviction
    pub eviction_interval: u64,
}

/// Available bucket map implementations
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Mutex-per-shard map
    Sharded,
    /// DashMap
    Dashmap,
}

impl std::str::FromStr for BackendType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sharded" => Ok(BackendType::Sharded),
            "dashmap" => Ok(BackendType::Dashmap),
            _ => Err(anyhow!(
                "Invalid backend: {}. Valid options are: sharded, dashmap",
                s
            )),
        }
    }
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables with the
/// `KEYBUCKET_` prefix. CLI arguments take precedence.
#[derive(Parser, Debug)]
#[command(
    name = "keybucket",
    about = "Per-key token bucket rate limiting server",
    long_about = "An HTTP server that rate limits arbitrary keys with independent token buckets.\n\nEnvironment variables with KEYBUCKET_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "KEYBUCKET_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 8080,
        env = "KEYBUCKET_PORT"
    )]
    pub port: u16,

    // Bucket configuration
    #[arg(
        long,
        value_name = "TOKENS",
        help = "Bucket capacity (burst size)",
        default_value_t = 10,
        env = "KEYBUCKET_CAPACITY"
    )]
    pub capacity: u64,
    #[arg(
        long,
        value_name = "MS",
        help = "Milliseconds to earn one token",
        default_value_t = 1000,
        env = "KEYBUCKET_REFILL_INTERVAL_MS"
    )]
    pub refill_interval_ms: u64,

    // Store configuration
    #[arg(
        long,
        value_name = "TYPE",
        help = "Bucket map backend: sharded, dashmap",
        default_value = "sharded",
        env = "KEYBUCKET_BACKEND"
    )]
    pub backend: BackendType,
    #[arg(
        long,
        value_name = "N",
        help = "Shard count (backend default if unset)",
        env = "KEYBUCKET_SHARDS"
    )]
    pub shards: Option<usize>,
    #[arg(
        long,
        value_name = "SECS",
        help = "Seconds between idle bucket sweeps, 0 disables eviction",
        default_value_t = 300,
        env = "KEYBUCKET_EVICTION_INTERVAL"
    )]
    pub eviction_interval: u64,

    // General options
    #[arg(
        long,
        value_name = "BYTES",
        help = "Longest accepted key",
        default_value_t = 256,
        env = "KEYBUCKET_MAX_KEY_LEN"
    )]
    pub max_key_len: usize,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "KEYBUCKET_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let config = Config {
            http: HttpConfig {
                host: args.host,
                port: args.port,
            },
            limiter: LimiterConfig {
                backend: args.backend,
                capacity: args.capacity,
                refill_interval_ms: args.refill_interval_ms,
                shards: args.shards,
                eviction_interval: args.eviction_interval,
            },
            max_key_len: args.max_key_len,
            log_level: args.log_level,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.limiter.capacity == 0 {
            return Err(anyhow!("--capacity must be at least 1"));
        }
        if self.limiter.refill_interval_ms == 0 {
            return Err(anyhow!("--refill-interval-ms must be at least 1"));
        }
        if self.limiter.shards == Some(0) {
            return Err(anyhow!("--shards must be at least 1"));
        }
        if self.max_key_len == 0 {
            return Err(anyhow!("--max-key-len must be at least 1"));
        }
        Ok(())
    }

    fn print_env_vars() {
        println!("keybucket Environment Variables");
        println!("===============================");
        println!();
        println!("All environment variables use the KEYBUCKET_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("HTTP Configuration:");
        println!("  KEYBUCKET_HOST=<host>                 HTTP host [default: 127.0.0.1]");
        println!("  KEYBUCKET_PORT=<port>                 HTTP port [default: 8080]");
        println!();

        println!("Bucket Configuration:");
        println!("  KEYBUCKET_CAPACITY=<tokens>           Bucket capacity [default: 10]");
        println!("  KEYBUCKET_REFILL_INTERVAL_MS=<ms>     Milliseconds per token [default: 1000]");
        println!();

        println!("Store Configuration:");
        println!("  KEYBUCKET_BACKEND=<type>              sharded, dashmap [default: sharded]");
        println!("  KEYBUCKET_SHARDS=<n>                  Shard count [default: backend default]");
        println!(
            "  KEYBUCKET_EVICTION_INTERVAL=<secs>    Idle sweep interval, 0 disables [default: 300]"
        );
        println!();

        println!("General Configuration:");
        println!("  KEYBUCKET_MAX_KEY_LEN=<bytes>         Longest accepted key [default: 256]");
        println!(
            "  KEYBUCKET_LOG_LEVEL=<level>           error, warn, info, debug, trace [default: info]"
        );
    }
}
