// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote artifact store: the [`ObjectStore`] seam, its S3 implementation and
//! the tenant-scoped lister.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::S3Config;
use crate::errors::StoreError;

/// Key of one remote artifact, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every key under `prefix`, in the order the store returns them.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Writes the object's bytes unchanged to `destination`.
    async fn download(&self, key: &str, destination: &Path) -> Result<(), StoreError>;

    /// Removes the object. Implementations may report a missing key as
    /// [`StoreError::NotFound`]; callers treat that as success.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Lists the tenant's staged artifacts.
///
/// The listing is all or nothing: a partial list could silently skip
/// artifacts, so any store failure is returned as-is.
pub async fn list_artifacts(
    store: &dyn ObjectStore,
    tenant_prefix: &str,
) -> Result<Vec<ArtifactRef>, StoreError> {
    let keys = store.list(tenant_prefix).await?;
    info!("Found {} artifacts under {}", keys.len(), tenant_prefix);
    Ok(keys.into_iter().map(ArtifactRef::new).collect())
}

/// Deletes `key`, treating an already missing object as deleted.
pub async fn delete_idempotent(store: &dyn ObjectStore, key: &str) -> Result<(), StoreError> {
    match store.delete(key).await {
        Ok(()) => Ok(()),
        Err(StoreError::NotFound(_)) => {
            debug!("{} was already deleted", key);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Builds a client from static credentials. No request is sent here.
    pub async fn connect(config: &S3Config) -> Result<Self, StoreError> {
        if config.bucket.is_empty() {
            return Err(StoreError::Connect("bucket name is empty".to_string()));
        }

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "cbdefense-forwarder",
        );
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.operation_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .timeout_config(timeouts);
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        info!("S3 client initialized for bucket {}", config.bucket);
        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                error!("S3 LIST failed - Bucket: {}, Prefix: {}, Error: {:?}", self.bucket, prefix, e);
                StoreError::List {
                    prefix: prefix.to_string(),
                    message: e.to_string(),
                }
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }
        Ok(keys)
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<(), StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return StoreError::NotFound(key.to_string());
                }
                StoreError::Download {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;

        let mut body = output.body;
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0usize;
        while let Some(chunk) = body.try_next().await.map_err(|e| StoreError::Download {
            key: key.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        debug!("Downloaded {} bytes of {} to {}", written, key, destination.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.raw_response().is_some_and(|raw| raw.status().as_u16() == 404) {
                    return Err(StoreError::NotFound(key.to_string()));
                }
                Err(StoreError::Delete {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}
