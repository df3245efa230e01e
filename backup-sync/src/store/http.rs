//! S3-compatible HTTP object store.
//!
//! Objects are addressed path-style as `<endpoint>/<bucket>/<key>`. `GET`
//! reads an object (404 means absent) and `PUT` writes it, carrying the
//! storage class in `x-amz-storage-class`. Authentication is an optional
//! bearer token checked by the gateway in front of the bucket. Use the S3
//! backend to talk to AWS directly.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

use super::{validate_key, ObjectStore, StorageClass};
use crate::utils::errors::{BackupError, Result};

const STORAGE_CLASS_HEADER: &str = "x-amz-storage-class";

pub struct HttpStore {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpStore {
    /// Create a store for `bucket` behind `endpoint`.
    pub fn new(
        endpoint: &str,
        bucket: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, endpoint, bucket, token)
    }

    /// Create a store using an already configured client.
    pub fn with_client(
        client: reqwest::Client,
        endpoint: &str,
        bucket: &str,
        token: Option<String>,
    ) -> Result<Self> {
        let mut base = Url::parse(endpoint)
            .map_err(|e| BackupError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        if base.cannot_be_a_base() {
            return Err(BackupError::Config(format!("invalid endpoint '{}'", endpoint)));
        }

        base.path_segments_mut()
            .map_err(|_| BackupError::Config(format!("invalid endpoint '{}'", endpoint)))?
            .pop_if_empty()
            .push(bucket);

        Ok(Self { client, base, token })
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        validate_key(key)?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackupError::InvalidKey(key.to_string()))?
            .push(key);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    fn location(&self) -> String {
        self.base.to_string()
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let url = self.object_url(key)?;
        let resp = self.authorize(self.client.get(url)).send().await?;

        match resp.status() {
            status if status.is_success() => Ok(Some(resp.bytes().await?)),
            StatusCode::NOT_FOUND => {
                debug!("{} not found in {}", key, self.base);
                Ok(None)
            }
            status => Err(BackupError::Remote {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn put(&self, key: &str, body: Bytes, storage_class: StorageClass) -> Result<()> {
        let url = self.object_url(key)?;
        let size = body.len();

        let request = self
            .client
            .put(url)
            .header(STORAGE_CLASS_HEADER, storage_class.as_str())
            .header("content-type", "application/octet-stream")
            .body(body);
        let resp = self.authorize(request).send().await?;

        if !resp.status().is_success() {
            return Err(BackupError::Remote {
                key: key.to_string(),
                status: resp.status().as_u16(),
            });
        }

        debug!("Uploaded {} ({} bytes, {})", key, size, storage_class);
        Ok(())
    }
}
