///
/// This module implements the CLI interface for mapuploader: command parsing,
/// routing, and the async entrypoint used by `main` and by integration tests.
///
/// The pipeline itself (credentials, staged upload, processing trigger) lives
/// in [`mapuploader-core`]; this module only wires the real clients into it.
///
/// ## How To Use
/// - Command line: `mapuploader -k <token> -u <user> upload roads.geojson --name roads`
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`mapuploader-core`]: ../../mapuploader_core/
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mapuploader_core::publish::{publish, PipelineReport};

use crate::load_config::{resolve, RawSettings};
use crate::mapbox::MapboxClient;
use crate::staging::S3Connector;

/// CLI for mapuploader: uploads data to mapbox servers.
#[derive(Parser, Debug)]
#[clap(
    name = "mapuploader",
    version,
    about = "Uploads GeoJSON or vector tile files to Mapbox and starts tileset processing"
)]
pub struct Cli {
    /// The key for mapbox api access
    #[clap(long = "mapbox-key", short = 'k', alias = "mapbox_key", env = "MAPBOX_KEY", hide_env_values = true, global = true)]
    pub mapbox_key: Option<String>,

    /// The mapbox username
    #[clap(long = "mapbox-user", short = 'u', alias = "mapbox_user", env = "MAPBOX_USER", global = true)]
    pub mapbox_user: Option<String>,

    /// Base URL of the Mapbox API
    #[clap(long, env = "MAPBOX_API_URL", hide = true, global = true)]
    pub api_url: Option<String>,

    /// Object store endpoint to stage uploads on instead of AWS S3
    #[clap(long, env = "MAPBOX_STAGING_ENDPOINT", hide = true, global = true)]
    pub staging_endpoint: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Uploads the geojson or tile to mapbox
    #[clap(alias = "u")]
    Upload {
        /// Local GeoJSON or vector tile file
        file: Option<PathBuf>,

        /// The name for the tileset
        #[clap(long, short = 'n')]
        name: Option<String>,
    },
}

fn print_summary(report: &PipelineReport) {
    println!("Upload started for tileset {}", report.tileset_id);
    println!(
        "  staged: s3://{}/{} ({} bytes, sha256 {})",
        report.staged.bucket, report.staged.key, report.staged.size, report.staged.sha256
    );
    let upload_id = report
        .trigger
        .job
        .as_ref()
        .and_then(|job| job.id.as_deref())
        .unwrap_or("unknown");
    println!("  mapbox upload id: {} (HTTP {})", upload_id, report.trigger.status);
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<PipelineReport> {
    tracing::info!("trace_initialised");

    let Cli {
        mapbox_key,
        mapbox_user,
        api_url,
        staging_endpoint,
        command,
    } = cli;

    match command {
        Commands::Upload { file, name } => {
            tracing::info!(command = "upload", "Starting upload");
            let config = resolve(RawSettings {
                api_key: mapbox_key,
                user_name: mapbox_user,
                api_url,
                staging_endpoint,
                file,
                tileset_name: name,
            })?;

            let mapbox = MapboxClient::new(config.api_url.clone())?;
            let connector = S3Connector::new(config.staging_endpoint.clone());

            match publish(&config.account, &config.request, &mapbox, &connector, &mapbox).await {
                Ok(report) => {
                    tracing::info!(command = "upload", tileset = %report.tileset_id, "Upload hand-off complete");
                    print_summary(&report);
                    Ok(report)
                }
                Err(e) => {
                    tracing::error!(command = "upload", stage = %e.stage(), error = %e, "Upload failed");
                    Err(anyhow::Error::new(e).context("upload to mapbox failed"))
                }
            }
        }
    }
}
