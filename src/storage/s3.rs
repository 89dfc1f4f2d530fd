//! S3-compatible gateway object store.
//!
//! Proxies storage operations to an S3-compatible bucket -- Cloudflare
//! R2, MinIO, or AWS S3 proper -- via a configurable `endpoint_url`.
//! Credentials are resolved through the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.).
//!
//! Blob metadata maps to S3 object metadata (`x-amz-meta-*`).

use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use super::store::{BlobMetadata, ObjectStore};
use crate::config::S3StorageConfig;

/// Gateway store that forwards operations to an S3-compatible bucket.
pub struct S3Store {
    client: Client,
    bucket: String,
    /// Key prefix applied to every document in the upstream bucket.
    prefix: String,
}

impl S3Store {
    /// Create a new gateway store from configuration.
    pub async fn new(config: &S3StorageConfig) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.endpoint_url.is_empty() {
            loader = loader.endpoint_url(&config.endpoint_url);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.use_path_style)
            .build();
        let client = Client::from_conf(s3_config);

        info!(
            "S3 gateway store initialized: bucket={} prefix='{}'",
            config.bucket, config.prefix
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    fn s3_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("S3 {context}: {err}")
    }
}

impl ObjectStore for S3Store {
    fn put(
        &self,
        key: &str,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);
            debug!("S3 put_object: bucket={} key={}", self.bucket, s3_key);

            let mut request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .content_type("application/json")
                .body(aws_sdk_s3::primitives::ByteStream::from(data));

            for (name, value) in metadata {
                request = request.metadata(name, value);
            }

            request
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;
            Ok(())
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);
            debug!("S3 get_object: bucket={} key={}", self.bucket, s3_key);

            let resp = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        return Ok(None);
                    }
                    return Err(Self::map_sdk_error("get_object", service_err));
                }
            };

            let body = resp
                .body
                .collect()
                .await
                .map_err(|e| Self::map_sdk_error("get_object body", e))?
                .into_bytes();
            Ok(Some(Bytes::from(body.to_vec())))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);
            debug!("S3 delete_object: bucket={} key={}", self.bucket, s3_key);

            // delete_object is idempotent upstream -- no error for missing keys.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", e))?;
            Ok(())
        })
    }

    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            let full_prefix = self.s3_key(&prefix);
            debug!("S3 list_objects_v2: bucket={} prefix={}", self.bucket, full_prefix);

            let mut keys = Vec::new();
            let mut continuation: Option<String> = None;

            loop {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(&full_prefix);
                if let Some(token) = &continuation {
                    request = request.continuation_token(token);
                }

                let resp = request
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error("list_objects_v2", e))?;

                for object in resp.contents() {
                    if let Some(upstream_key) = object.key() {
                        // Strip the gateway prefix back off.
                        if let Some(local) = upstream_key.strip_prefix(&self.prefix) {
                            keys.push(local.to_string());
                        }
                    }
                }

                match resp.next_continuation_token() {
                    Some(token) => continuation = Some(token.to_string()),
                    None => break,
                }
            }

            keys.sort();
            Ok(keys)
        })
    }
}
