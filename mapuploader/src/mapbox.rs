#![doc = "Mapbox uploads API client: implements the credential broker and processing trigger contracts over reqwest."]
//
//! # Mapbox uploads API (CLI <-> Core)
//!
//! [`MapboxClient`] is the networked implementation of both
//! [`CredentialBroker`] and [`ProcessingTrigger`] from `mapuploader-core`.
//!
//! - `GET  {api_url}/uploads/v1/{user}/credentials?access_token=..` for staging credentials
//! - `POST {api_url}/uploads/v1/{user}?access_token=..` to start tileset processing
//!
//! The access token only ever travels as the `access_token` query parameter,
//! and is stripped from every URL that gets logged. Every call is a single
//! attempt bounded by [`REQUEST_TIMEOUT`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, Url};
use serde::Serialize;

use mapuploader_core::contract::{CredentialBroker, ProcessingTrigger};
use mapuploader_core::{Account, CredentialSet, PipelineError, TriggerResponse, UploadJob};

pub const DEFAULT_API_URL: &str = "https://api.mapbox.com";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of the processing request. Exactly these three fields go on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerPayload {
    pub url: String,
    pub tileset: String,
    pub name: String,
}

impl TriggerPayload {
    pub fn new(account: &Account, staging_url: &str, tileset_name: &str) -> Result<Self, PipelineError> {
        let url = Url::parse(staging_url).map_err(|e| {
            tracing::error!(error = %e, "Staging URL from credentials is not a valid URL");
            PipelineError::TriggerRequest(Box::new(e))
        })?;
        Ok(Self {
            url: url.to_string(),
            tileset: account.tileset_id(tileset_name),
            name: tileset_name.to_string(),
        })
    }
}

/// Non-2xx answer to the processing request.
#[derive(Debug, thiserror::Error)]
#[error("mapbox answered HTTP {status}: {body}")]
pub struct TriggerRejected {
    pub status: u16,
    pub body: String,
}

pub struct MapboxClient {
    http: Client,
    api_url: Url,
}

impl MapboxClient {
    pub fn new(api_url: Url) -> Result<Self, PipelineError> {
        if api_url.cannot_be_a_base() {
            return Err(PipelineError::Configuration(format!(
                "mapbox api url {api_url} cannot carry a path"
            )));
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("could not build http client: {e}")))?;
        tracing::info!(api_url = %api_url, timeout_secs = REQUEST_TIMEOUT.as_secs(), "Initialized MapboxClient");
        Ok(Self { http, api_url })
    }

    /// `{api_url}/uploads/v1/{user}[/extra]?access_token={key}`, with the
    /// user name percent-encoded as a single path segment.
    pub fn uploads_url(&self, account: &Account, extra: Option<&str>) -> Result<Url, PipelineError> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                PipelineError::Configuration(format!("mapbox api url {} cannot carry a path", self.api_url))
            })?;
            segments
                .pop_if_empty()
                .extend(["uploads", "v1", account.user_name.as_str()]);
            if let Some(extra) = extra {
                segments.push(extra);
            }
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("access_token", &account.api_key);
        Ok(url)
    }
}

/// The URL without its query string, safe to log.
fn loggable(url: &Url) -> String {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.to_string()
}

#[async_trait]
impl CredentialBroker for MapboxClient {
    async fn fetch_credentials(&self, account: &Account) -> Result<CredentialSet, PipelineError> {
        let url = self.uploads_url(account, Some("credentials"))?;
        tracing::info!(endpoint = %loggable(&url), user = %account.user_name, "Requesting staging credentials");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                let e = e.without_url();
                tracing::error!(error = %e, endpoint = %loggable(&url), "Credentials request failed");
                PipelineError::CredentialFetch(Box::new(e))
            })?;

        let body = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!(error = %e, "Failed to read credentials response body");
            PipelineError::CredentialFetch(Box::new(e))
        })?;

        match serde_json::from_slice::<CredentialSet>(&body) {
            Ok(credentials) => {
                tracing::info!(
                    bucket = %credentials.bucket,
                    key = %credentials.key,
                    "Decoded staging credentials"
                );
                Ok(credentials)
            }
            Err(e) => {
                tracing::error!(error = %e, bytes = body.len(), "Failed to decode credentials response");
                Err(PipelineError::CredentialDecode(Box::new(e)))
            }
        }
    }
}

#[async_trait]
impl ProcessingTrigger for MapboxClient {
    async fn start_processing(
        &self,
        account: &Account,
        staging_url: &str,
        tileset_name: &str,
    ) -> Result<TriggerResponse, PipelineError> {
        let url = self.uploads_url(account, None)?;
        let payload = TriggerPayload::new(account, staging_url, tileset_name)?;
        tracing::info!(
            endpoint = %loggable(&url),
            tileset = %payload.tileset,
            staging_url = %payload.url,
            "Requesting tileset processing"
        );

        let response = self
            .http
            .post(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                tracing::error!(error = %e, endpoint = %loggable(&url), "Processing request failed");
                PipelineError::TriggerRequest(Box::new(e))
            })?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));

        tracing::info!(status = %status, ?headers, body = %body, "Processing response received");

        if !status.is_success() {
            tracing::error!(status = %status, tileset = %payload.tileset, "Mapbox rejected the processing request");
            return Err(PipelineError::TriggerRequest(Box::new(TriggerRejected {
                status: status.as_u16(),
                body,
            })));
        }

        let job = serde_json::from_str::<UploadJob>(&body).ok();
        Ok(TriggerResponse {
            status: status.as_u16(),
            headers,
            body,
            job,
        })
    }
}
