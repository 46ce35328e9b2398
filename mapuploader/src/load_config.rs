/// `load_config` module: turns parsed CLI flags and environment into a validated [`UploaderConfig`].
///
/// Flags and their environment fallbacks are resolved by clap; this module is
/// where the raw strings become typed values.
///
/// # Responsibilities
/// - Trim and check the API key, user name, tileset name and file path
/// - Parse the API base URL override
/// - Fail with [`PipelineError::Configuration`] before anything touches the network
///
/// There is no on-disk configuration beyond the optional `.env` file loaded in `main`.
use std::path::PathBuf;

use reqwest::Url;
use tracing::{error, info};

use mapuploader_core::{Account, PipelineError, UploadRequest};

use crate::mapbox::DEFAULT_API_URL;

/// Raw values as they arrive from the command line.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub api_key: Option<String>,
    pub user_name: Option<String>,
    pub api_url: Option<String>,
    pub staging_endpoint: Option<String>,
    pub file: Option<PathBuf>,
    pub tileset_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub account: Account,
    pub request: UploadRequest,
    pub api_url: Url,
    pub staging_endpoint: Option<String>,
}

fn required(value: Option<String>, message: &str) -> Result<String, PipelineError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            error!(reason = message, "Missing required configuration");
            Err(PipelineError::Configuration(message.to_string()))
        }
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn resolve(raw: RawSettings) -> Result<UploaderConfig, PipelineError> {
    let api_key = required(raw.api_key, "you need to provide a mapbox access token (--mapbox-key or MAPBOX_KEY)")?;
    let user_name = required(raw.user_name, "you need to provide the mapbox username (--mapbox-user or MAPBOX_USER)")?;
    let tileset_name = required(raw.tileset_name, "you need to provide the name for the tileset (--name)")?;
    let file = match raw.file {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => {
            error!("No file given to upload");
            return Err(PipelineError::Configuration(
                "you need to provide the file to upload".to_string(),
            ));
        }
    };

    let api_url_raw = optional(raw.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let api_url = Url::parse(&api_url_raw).map_err(|e| {
        error!(error = %e, api_url = %api_url_raw, "Invalid mapbox api url");
        PipelineError::Configuration(format!("invalid mapbox api url {api_url_raw}: {e}"))
    })?;
    let staging_endpoint = optional(raw.staging_endpoint);

    info!(
        user = %user_name,
        api_url = %api_url,
        staging_endpoint = staging_endpoint.as_deref().unwrap_or("aws"),
        file = %file.display(),
        tileset_name = %tileset_name,
        "Configuration resolved"
    );

    Ok(UploaderConfig {
        account: Account::new(api_key, user_name),
        request: UploadRequest::new(file, tileset_name),
        api_url,
        staging_endpoint,
    })
}
