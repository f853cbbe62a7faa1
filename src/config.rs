//! Configuration management for the WMS GeoTIFF service.
//!
//! This module provides the command-line interface:
//! - `serve`: run the WMS front service in front of an upstream renderer
//! - `convert`: transcode a PNG file into a GeoTIFF file
//! - `inspect`: print the georeferencing of a GeoTIFF file
//!
//! # Environment Variables
//!
//! Server options can also be set via environment variables with the
//! `WMS_TIFF_` prefix:
//!
//! - `WMS_TIFF_HOST` - Server bind address (default: 0.0.0.0)
//! - `WMS_TIFF_PORT` - Server port (default: 3000)
//! - `WMS_TIFF_UPSTREAM_URL` - WMS endpoint of the map renderer (required)
//! - `WMS_TIFF_UPSTREAM_TIMEOUT` - Upstream timeout in seconds (default: 30)
//! - `WMS_TIFF_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upstream timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT: u64 = 30;

/// Longest upstream timeout accepted, in seconds.
pub const MAX_UPSTREAM_TIMEOUT: u64 = 600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WMS GeoTIFF - adds image/tiff output to a PNG-only WMS.
#[derive(Parser, Debug, Clone)]
#[command(name = "wms-tiff")]
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
    /// Run the WMS front service.
    Serve(ServeConfig),

    /// Transcode a PNG file into a GeoTIFF.
    Convert(ConvertConfig),

    /// Print the georeferencing of a GeoTIFF.
    Inspect(InspectConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WMS_TIFF_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WMS_TIFF_PORT")]
    pub port: u16,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// WMS endpoint of the map renderer (e.g. http://localhost:8080/ows).
    #[arg(long, env = "WMS_TIFF_UPSTREAM_URL")]
    pub upstream_url: String,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_UPSTREAM_TIMEOUT, env = "WMS_TIFF_UPSTREAM_TIMEOUT")]
    pub upstream_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WMS_TIFF_CORS_ORIGINS", value_delimiter = ',')]
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
        if self.upstream_url.is_empty() {
            return Err(
                "Upstream URL is required. Set --upstream-url or WMS_TIFF_UPSTREAM_URL".to_string(),
            );
        }

        if !(self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://"))
        {
            return Err(format!(
                "Upstream URL must be http:// or https://, got '{}'",
                self.upstream_url
            ));
        }

        if self.upstream_timeout == 0 || self.upstream_timeout > MAX_UPSTREAM_TIMEOUT {
            return Err(format!(
                "upstream_timeout must be between 1 and {} seconds",
                MAX_UPSTREAM_TIMEOUT
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Convert
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    /// PNG file to read.
    pub input: PathBuf,

    /// GeoTIFF file to write.
    pub output: PathBuf,

    /// Extent as minX,minY,maxX,maxY.
    #[arg(long, default_value = "")]
    pub bbox: String,

    /// Coordinate reference system (e.g. EPSG:4326).
    #[arg(long, default_value = "")]
    pub crs: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.input == self.output {
            return Err("Input and output must be different files".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Inspect
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// GeoTIFF file to read.
    pub input: PathBuf,

    /// Print as JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServeConfig {
        ServeConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            upstream_url: "http://localhost:8081/ows".to_string(),
            upstream_timeout: 30,
            cors_origins: None,
            verbose: false,
            no_tracing: false,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_missing_upstream() {
        let mut config = test_config();
        config.upstream_url = String::new();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Upstream URL"));
    }

    #[test]
    fn test_upstream_scheme() {
        let mut config = test_config();
        config.upstream_url = "ftp://example.com/wms".to_string();
        assert!(config.validate().is_err());

        config.upstream_url = "https://example.com/wms".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = test_config();
        config.upstream_timeout = 0;
        assert!(config.validate().is_err());

        config.upstream_timeout = MAX_UPSTREAM_TIMEOUT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "wms-tiff",
            "serve",
            "--upstream-url",
            "http://renderer/ows",
            "--port",
            "9000",
            "--cors-origins",
            "https://a.com,https://b.com",
        ])
        .unwrap();

        match cli.into_command() {
            Command::Serve(config) => {
                assert_eq!(config.port, 9000);
                assert_eq!(config.upstream_url, "http://renderer/ows");
                assert_eq!(config.cors_origins.unwrap().len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "wms-tiff",
            "convert",
            "map.png",
            "map.tif",
            "--bbox",
            "0,0,10,10",
            "--crs",
            "EPSG:4326",
        ])
        .unwrap();

        match cli.into_command() {
            Command::Convert(config) => {
                assert_eq!(config.input, PathBuf::from("map.png"));
                assert_eq!(config.bbox, "0,0,10,10");
                assert!(config.validate().is_ok());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_convert_same_file() {
        let config = ConvertConfig {
            input: PathBuf::from("a.tif"),
            output: PathBuf::from("a.tif"),
            bbox: String::new(),
            crs: String::new(),
            verbose: false,
        };
        assert!(config.validate().is_err());
    }
}
