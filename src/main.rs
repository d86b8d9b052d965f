//! COG Cache - a range-cache proxy for Cloud-Optimized GeoTIFFs.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cog_cache::{
    cache::{CacheBackend, ResourceKey},
    config::{Cli, Command, InspectConfig, InspectOutputFormat, ServeConfig},
    format::tiff::{detect_format, extract_tile_ranges, parse_ifds, ByteRange, TiffFormat},
    io::{HttpRangeFetcher, RangeFetcher},
    server::{create_router, AppState, RouterConfig},
    service::IngestConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Inspect(config) => run_inspect(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("COG Cache v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Cache: {}", config.cache_uri);
    info!("  Header prefix: {} bytes", config.header_size);
    info!("  Concurrent tile fetches: {}", config.max_concurrent_fetches);
    info!("  Origin timeout: {}s", config.request_timeout);

    let cache = match CacheBackend::connect(&config.cache_uri).await {
        Ok(cache) => {
            info!("  Connected to {} cache", cache.name());
            cache
        }
        Err(e) => {
            error!("Failed to connect to cache at {}: {}", config.cache_uri, e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpRangeFetcher::new(config.request_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ingest_config = IngestConfig {
        header_size: config.header_size,
        max_concurrent_fetches: config.max_concurrent_fetches,
    };
    let state = AppState::new(Arc::new(fetcher), Arc::new(cache), ingest_config);
    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -X POST 'http://{}/?url=<cog-url>'", addr);
    info!("    curl -H 'Range: bytes=0-16383' http://{}/<host>/<path>", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "cog_cache=debug,tower_http=debug"
    } else {
        "cog_cache=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Inspect Command
// =============================================================================

/// Machine-readable output of `inspect --format json`.
#[derive(Serialize)]
struct InspectReport<'a> {
    url: &'a str,
    identifier: &'a str,
    format: &'static str,
    header_bytes: usize,
    ifd_count: usize,
    tile_count: usize,
    total_tile_bytes: u64,
    tiles: &'a [ByteRange],
}

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let key = match ResourceKey::from_url(&config.url) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpRangeFetcher::new(config.request_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let header = match fetcher
        .fetch_range(&config.url, 0, config.header_size as u64)
        .await
    {
        Ok(header) => header,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = match detect_format(&header) {
        Ok(TiffFormat::BigTiff) => {
            eprintln!("Error: {} is a BigTIFF, which is not supported", config.url);
            return ExitCode::FAILURE;
        }
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (ifd_count, tiles) = match parse_ifds(&header).and_then(|ifds| {
        extract_tile_ranges(&header).map(|tiles| (ifds.len(), tiles))
    }) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = InspectReport {
        url: &config.url,
        identifier: key.identifier(),
        format: format.name(),
        header_bytes: header.len(),
        ifd_count,
        tile_count: tiles.len(),
        total_tile_bytes: tiles.iter().map(|t| t.length).sum(),
        tiles: &tiles,
    };

    match config.format {
        InspectOutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        InspectOutputFormat::Text => print_text_report(&report),
    }

    ExitCode::SUCCESS
}

fn print_text_report(report: &InspectReport<'_>) {
    println!("Source:     {}", report.url);
    println!("Identifier: {}", report.identifier);
    println!("Format:     {}", report.format);
    println!("Header:     {} bytes", report.header_bytes);
    println!("IFDs:       {}", report.ifd_count);
    println!(
        "Tiles:      {} ({} bytes)",
        report.tile_count, report.total_tile_bytes
    );
    println!();
    println!("{:>12} {:>12}", "offset", "length");
    for tile in report.tiles {
        println!("{:>12} {:>12}", tile.offset, tile.length);
    }
}
