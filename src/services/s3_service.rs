use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum PresignError {
    #[error("invalid presign expiry: {0}")]
    InvalidExpiry(String),

    #[error("request rejected by signer: {0}")]
    Rejected(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl PresignError {
    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PresignError::Unavailable(_))
    }

    /// Client-safe description; never includes backend error text.
    pub fn public_detail(&self) -> &'static str {
        match self {
            PresignError::InvalidExpiry(_) => "invalid presign configuration",
            PresignError::Rejected(_) => "request could not be signed",
            PresignError::Unavailable(_) => "storage backend unavailable",
        }
    }
}

impl<E, R> From<SdkError<E, R>> for PresignError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        let message = DisplayErrorContext(&err).to_string();
        match err {
            SdkError::ConstructionFailure(_) => PresignError::Rejected(message),
            _ => PresignError::Unavailable(message),
        }
    }
}

/// Issues time-limited upload URLs without exposing storage credentials.
#[async_trait]
pub trait Presigner: Send + Sync {
    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, PresignError>;
}

#[derive(Clone)]
pub struct S3Service {
    client: Client,
}

impl S3Service {
    pub async fn new(config: &Config) -> Self {
        let credentials = Credentials::new(
            config.s3_access_key.clone(),
            config.s3_secret_key.clone(),
            None,
            None,
            "static",
        );

        let region = Region::new(config.s3_region.clone());

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .endpoint_url(config.s3_endpoint_url())
            .load()
            .await;

        // MinIO and most self-hosted endpoints need path-style addressing.
        // Checksums stay off so the signed URL accepts any body the client sends.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(config.s3_force_path_style)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl Presigner for S3Service {
    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, PresignError> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| PresignError::InvalidExpiry(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning_config)
            .await?;

        Ok(presigned_req.uri().to_string())
    }
}
