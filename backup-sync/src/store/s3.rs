//! AWS S3 object store.
//!
//! Credentials and region come from the standard AWS chain (environment,
//! shared config and credentials files, instance metadata), optionally
//! narrowed to a named profile. A custom endpoint switches to path-style
//! addressing for S3-compatible services.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

use super::{validate_key, ObjectStore, StorageClass};
use crate::config::StoreConfig;
use crate::utils::errors::{BackupError, Result};

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from the AWS environment and `config`.
    pub async fn connect(bucket: &str, config: &StoreConfig) -> Result<Self> {
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_secs))
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::from_client(Client::from_conf(builder.build()), bucket))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

/// HTTP status of a failed request, when the service answered.
fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|resp| resp.status().as_u16())
}

/// Map an SDK failure to a store error, keeping the HTTP status if any.
fn request_error<E>(key: &str, err: SdkError<E, HttpResponse>) -> BackupError
where
    E: std::error::Error + 'static,
{
    match status_of(&err) {
        Some(status) => BackupError::Remote {
            key: key.to_string(),
            status,
        },
        None => BackupError::S3 {
            key: key.to_string(),
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        validate_key(key)?;

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(SdkError::ServiceError(e)) if matches!(e.err(), GetObjectError::NoSuchKey(_)) => {
                debug!("{} not found in s3://{}", key, self.bucket);
                return Ok(None);
            }
            Err(e) if status_of(&e) == Some(404) => {
                debug!("{} not found in s3://{}", key, self.bucket);
                return Ok(None);
            }
            Err(e) => return Err(request_error(key, e)),
        };

        let body = output.body.collect().await.map_err(|e| BackupError::S3 {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(body.into_bytes()))
    }

    async fn put(&self, key: &str, body: Bytes, storage_class: StorageClass) -> Result<()> {
        validate_key(key)?;
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .storage_class(aws_sdk_s3::types::StorageClass::from(storage_class.as_str()))
            .content_type("application/octet-stream")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| request_error(key, e))?;

        debug!(
            "Uploaded s3://{}/{} ({} bytes, {})",
            self.bucket, key, size, storage_class
        );
        Ok(())
    }
}
