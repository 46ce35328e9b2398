//! Plain data flowing through a publish run.
//!
//! Nothing here is persisted: an [`Account`] and an [`UploadRequest`] come in
//! from the caller, a [`CredentialSet`] lives for exactly one run, and a
//! [`StagedObject`] / [`TriggerResponse`] describe what happened remotely.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Mapbox account the run acts for.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub api_key: String,
    pub user_name: String,
}

impl Account {
    pub fn new(api_key: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            user_name: user_name.into(),
        }
    }

    /// Fully-qualified tileset identifier, `<user_name>.<tileset_name>`.
    pub fn tileset_id(&self, tileset_name: &str) -> String {
        format!("{}.{}", self.user_name, tileset_name)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "you need to provide a mapbox access token".to_string(),
            ));
        }
        if self.user_name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "you need to provide the mapbox username".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("api_key", &"<redacted>")
            .field("user_name", &self.user_name)
            .finish()
    }
}

/// What to upload and what to call the resulting tileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    /// Human-readable tileset name; also the suffix of the tileset id.
    pub tileset_name: String,
}

impl UploadRequest {
    pub fn new(file_path: impl Into<PathBuf>, tileset_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            tileset_name: tileset_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.tileset_name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "you need to provide the name for the tileset".to_string(),
            ));
        }
        if self.file_path.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(
                "you need to provide the file to upload".to_string(),
            ));
        }
        Ok(())
    }
}

/// Temporary staging credentials and destination, as returned by
/// `GET /uploads/v1/{user}/credentials`.
///
/// The wire names (`accessKeyId`, `secretAccessKey`, ...) are the external
/// contract.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
    pub access_key_id: String,
    pub bucket: String,
    pub key: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub url: String,
}

impl CredentialSet {
    /// All six fields must be non-empty before the set is used.
    pub fn ensure_complete(&self) -> Result<(), PipelineError> {
        let fields = [
            ("accessKeyId", &self.access_key_id),
            ("bucket", &self.bucket),
            ("key", &self.key),
            ("secretAccessKey", &self.secret_access_key),
            ("sessionToken", &self.session_token),
            ("url", &self.url),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::CredentialDecode(
                format!("credentials response has empty fields: {}", missing.join(", ")).into(),
            ))
        }
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_key_id", &self.access_key_id)
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

/// The object written to the staging store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    /// Hex SHA-256 of the uploaded bytes.
    pub sha256: String,
}

/// Upload job record returned by `POST /uploads/v1/{user}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadJob {
    pub id: Option<String>,
    pub tileset: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub complete: bool,
    pub progress: f64,
    pub error: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// What the platform said when asked to start processing.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// The decoded job, when the body is a job record.
    pub job: Option<UploadJob>,
}
