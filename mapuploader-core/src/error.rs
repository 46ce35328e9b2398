use std::fmt;
use std::path::PathBuf;

/// Boxed error used at the trait seams (same shape as every client error).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Credentials,
    Upload,
    Trigger,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Credentials => "credentials",
            Stage::Upload => "upload",
            Stage::Trigger => "trigger",
        };
        f.write_str(name)
    }
}

/// Every way a publish run can fail. All of them are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not retrieve mapbox credentials: {0}")]
    CredentialFetch(#[source] BoxError),

    #[error("could not decode mapbox credentials: {0}")]
    CredentialDecode(#[source] BoxError),

    #[error("could not open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload to s3://{bucket}/{key} failed: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("tileset processing request failed: {0}")]
    TriggerRequest(#[source] BoxError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Configuration(_) => Stage::Configuration,
            PipelineError::CredentialFetch(_) | PipelineError::CredentialDecode(_) => {
                Stage::Credentials
            }
            PipelineError::FileOpen { .. } | PipelineError::Upload { .. } => Stage::Upload,
            PipelineError::TriggerRequest(_) => Stage::Trigger,
        }
    }
}
