//! S3 implementation of the staging store.
//!
//! Each [`S3Connector::connect`] call builds a fresh client whose only
//! credentials are the temporary ones handed out by Mapbox. Nothing is read
//! from or written to the process environment or the shared AWS profile.

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use mapuploader_core::contract::{ObjectStore, StoreConnector};
use mapuploader_core::{BoxError, CredentialSet};

/// Region of the Mapbox staging buckets.
pub const STAGING_REGION: &str = "us-east-1";

const CREDENTIALS_PROVIDER: &str = "mapbox-upload-credentials";

#[derive(Debug, Clone, Default)]
pub struct S3Connector {
    /// Custom endpoint (path-style) instead of AWS, e.g. a local stand-in.
    pub endpoint: Option<String>,
}

impl S3Connector {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint }
    }
}

impl StoreConnector for S3Connector {
    fn connect(&self, credentials: &CredentialSet) -> Result<Box<dyn ObjectStore>, BoxError> {
        let session = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(STAGING_REGION))
            .credentials_provider(session)
            .retry_config(RetryConfig::disabled())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            access_key_id = %credentials.access_key_id,
            region = STAGING_REGION,
            endpoint = self.endpoint.as_deref().unwrap_or("aws"),
            "Built S3 client from temporary credentials"
        );
        Ok(Box::new(S3ObjectStore {
            client: Client::from_conf(builder.build()),
        }))
    }
}

pub struct S3ObjectStore {
    client: Client,
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError> {
        let size = body.len() as i64;
        match self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size)
            .body(ByteStream::from(body))
            .send()
            .await
        {
            Ok(output) => {
                tracing::info!(
                    bucket,
                    key,
                    size,
                    e_tag = output.e_tag().unwrap_or("-"),
                    "PutObject succeeded"
                );
                Ok(())
            }
            Err(e) => {
                let detail = DisplayErrorContext(&e).to_string();
                tracing::error!(bucket, key, error = %detail, "PutObject failed");
                Err(detail.into())
            }
        }
    }
}
