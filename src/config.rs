//! Configuration management for the COG range cache.
//!
//! This module provides the command-line interface, with every `serve`
//! option also settable through a `COG_`-prefixed environment variable.
//!
//! # Commands
//!
//! - `serve` - Run the HTTP cache proxy
//! - `inspect <url>` - Print the tile ranges of a remote COG without caching
//!
//! # Environment Variables
//!
//! - `COG_HOST` - Server bind address (default: 0.0.0.0)
//! - `COG_PORT` - Server port (default: 8000)
//! - `COG_CACHE_URI` - Cache backend, `redis://...` or `memory://` (default: redis://127.0.0.1:6379)
//! - `COG_HEADER_SIZE` - Header prefix fetched per ingestion in bytes (default: 16384)
//! - `COG_MAX_CONCURRENT_FETCHES` - Tile fetches in flight per ingestion (default: 32)
//! - `COG_REQUEST_TIMEOUT` - Origin request timeout in seconds (default: 30)
//! - `COG_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cache::MEMORY_URI;
use crate::format::tiff::TIFF_HEADER_SIZE;
use crate::service::{DEFAULT_HEADER_SIZE, DEFAULT_MAX_CONCURRENT_FETCHES};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default cache backend.
pub const DEFAULT_CACHE_URI: &str = "redis://127.0.0.1:6379";

/// Default origin request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest accepted header prefix (16 MiB).
pub const MAX_HEADER_SIZE: usize = 16 * 1024 * 1024;

const REDIS_SCHEMES: [&str; 3] = ["redis://", "rediss://", "redis+unix://"];

// =============================================================================
// CLI Arguments
// =============================================================================

/// COG Cache - a range-cache proxy for Cloud-Optimized GeoTIFFs.
///
/// Ingests the tiles of a remote COG into a key-value cache and serves them
/// back to HTTP range requests without touching the origin again.
#[derive(Parser, Debug, Clone)]
#[command(name = "cog-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP cache proxy.
    Serve(ServeConfig),

    /// Print the tile ranges of a remote COG without caching anything.
    Inspect(InspectConfig),
}

/// Options for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "COG_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "COG_PORT")]
    pub port: u16,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Cache backend URI: `redis://host:port[/db]` or `memory://`.
    #[arg(long, default_value = DEFAULT_CACHE_URI, env = "COG_CACHE_URI")]
    pub cache_uri: String,

    // =========================================================================
    // Ingestion Configuration
    // =========================================================================
    /// Bytes fetched from the start of each COG; all IFDs must fit in it.
    #[arg(long, default_value_t = DEFAULT_HEADER_SIZE, env = "COG_HEADER_SIZE")]
    pub header_size: usize,

    /// Maximum tile fetches in flight per ingestion.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_FETCHES, env = "COG_MAX_CONCURRENT_FETCHES")]
    pub max_concurrent_fetches: usize,

    /// Origin request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "COG_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "COG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_header_size(self.header_size)?;

        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be greater than 0".to_string());
        }

        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }

        if self.cache_uri != MEMORY_URI
            && !REDIS_SCHEMES
                .iter()
                .any(|scheme| self.cache_uri.starts_with(scheme))
        {
            return Err(format!(
                "Unsupported cache URI '{}'. Use redis://host:port or {}",
                self.cache_uri, MEMORY_URI
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Output format for the `inspect` command.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InspectOutputFormat {
    /// One `offset length` pair per line
    #[default]
    Text,

    /// A JSON document with the format and all ranges
    Json,
}

/// Options for the `inspect` command.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Source URL of the COG.
    pub url: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = InspectOutputFormat::Text)]
    pub format: InspectOutputFormat,

    /// Bytes fetched from the start of the COG.
    #[arg(long, default_value_t = DEFAULT_HEADER_SIZE, env = "COG_HEADER_SIZE")]
    pub header_size: usize,

    /// Origin request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "COG_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_header_size(self.header_size)?;
        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn validate_header_size(header_size: usize) -> Result<(), String> {
    if !(TIFF_HEADER_SIZE..=MAX_HEADER_SIZE).contains(&header_size) {
        return Err(format!(
            "header_size must be between {} bytes and 16MB",
            TIFF_HEADER_SIZE
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
