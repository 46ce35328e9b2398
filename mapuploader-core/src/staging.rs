//! Staged upload: local file → staging bucket/key.
//!
//! The whole file is read into memory and written with a single put.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

use crate::contract::ObjectStore;
use crate::error::PipelineError;
use crate::model::{CredentialSet, StagedObject};

/// Read `path` fully and put it at the credential set's bucket/key.
///
/// The store is never contacted when the file cannot be opened or read.
pub async fn stage_file(
    store: &dyn ObjectStore,
    credentials: &CredentialSet,
    path: &Path,
) -> Result<StagedObject, PipelineError> {
    let body = read_whole_file(path).await?;
    let size = body.len() as u64;
    let sha256 = format!("{:x}", Sha256::digest(&body));

    info!(
        file = %path.display(),
        bucket = %credentials.bucket,
        key = %credentials.key,
        size,
        "Putting file into staging bucket"
    );

    match store
        .put_object(&credentials.bucket, &credentials.key, body)
        .await
    {
        Ok(()) => {
            info!(bucket = %credentials.bucket, key = %credentials.key, %sha256, "Staged upload complete");
            Ok(StagedObject {
                bucket: credentials.bucket.clone(),
                key: credentials.key.clone(),
                size,
                sha256,
            })
        }
        Err(e) => {
            error!(error = %e, bucket = %credentials.bucket, key = %credentials.key, "Staged upload failed");
            Err(PipelineError::Upload {
                bucket: credentials.bucket.clone(),
                key: credentials.key.clone(),
                source: e,
            })
        }
    }
}

async fn read_whole_file(path: &Path) -> Result<Vec<u8>, PipelineError> {
    let open_error = |source: std::io::Error| PipelineError::FileOpen {
        path: path.to_path_buf(),
        source,
    };

    // The handle is dropped on return, whatever happens to the put.
    let mut file = tokio::fs::File::open(path).await.map_err(open_error)?;
    let expected = file.metadata().await.map_err(open_error)?.len();
    debug!(file = %path.display(), size = expected, "Opened local file");

    let mut buffer = Vec::with_capacity(expected as usize);
    file.read_to_end(&mut buffer).await.map_err(open_error)?;
    Ok(buffer)
}
