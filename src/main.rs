//! WMS GeoTIFF - adds image/tiff output to a PNG-only WMS.
//!
//! This binary starts the HTTP server or runs one of the file commands.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wms_tiff::{
    config::{Cli, Command, ConvertConfig, InspectConfig, ServeConfig},
    format::tiff::read_raster,
    raster::RasterEncoder,
    server::{create_router, HttpMapRenderer, RouterConfig},
    GeoTiffFilter,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Convert(config) => run_convert(config).await,
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

    let renderer = match HttpMapRenderer::new(&config.upstream_url, config.upstream_timeout) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Failed to create upstream client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("WMS GeoTIFF v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Upstream: {}", renderer.base_url());
    info!("  Upstream timeout: {}s", config.upstream_timeout);

    let router = create_router(renderer, GeoTiffFilter::new(), build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl 'http://{}/wms?SERVICE=WMS&REQUEST=GetCapabilities'",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
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
        "wms_tiff=debug,tower_http=debug"
    } else {
        "wms_tiff=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Convert Command
// =============================================================================

async fn run_convert(config: ConvertConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let png = match tokio::fs::read(&config.input).await {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let bbox = config.bbox.clone();
    let crs = config.crs.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        RasterEncoder::new().encode_png(&png, &bbox, &crs)
    })
    .await;

    let tiff = match encoded {
        Ok(Ok(tiff)) => tiff,
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: encoder task failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::fs::write(&config.output, &tiff).await {
        eprintln!("Error: cannot write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    println!(
        "Wrote {} ({} bytes)",
        config.output.display(),
        tiff.len()
    );
    ExitCode::SUCCESS
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    let data = match tokio::fs::read(&config.input).await {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let raster = match read_raster(&data) {
        Ok(raster) => raster,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let json = serde_json::json!({
            "width": raster.width,
            "height": raster.height,
            "bands": 4,
            "compression": raster.compression.name(),
            "planar_configuration": raster.planar_configuration,
            "geo_transform": raster.transform.map(|t| t.to_array()),
            "crs": raster.crs.map(|c| c.to_string()),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("{}", config.input.display());
    println!("  Size:        {} x {}, 4 bands", raster.width, raster.height);
    println!("  Compression: {}", raster.compression.name());
    match raster.transform {
        Some(t) => {
            println!("  Origin:      ({}, {})", t.origin_x, t.origin_y);
            println!("  Pixel size:  ({}, {})", t.pixel_width, t.pixel_height);
        }
        None => println!("  Georeference: none"),
    }
    match raster.crs {
        Some(crs) => println!("  CRS:         {}", crs),
        None => println!("  CRS:         none"),
    }

    ExitCode::SUCCESS
}
