// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ARTIFACT_PREFIX: &str = "dsoffice";
const DEFAULT_STAGING_DIR: &str = "datadir";
const DEFAULT_SYSLOG_ADDR: &str = "127.0.0.1:514";
const DEFAULT_S3_TIMEOUT_SECS: u64 = 60;

/// Object store access settings.
#[derive(Clone)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint, e.g. a MinIO instance. Forces path-style addressing.
    pub endpoint: Option<String>,
    /// Applied to every S3 operation.
    pub operation_timeout: Duration,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub s3: S3Config,
    /// Tenant identifier, the `org_key` artifacts are partitioned by.
    pub org_key: String,
    /// Fixed prefix in front of `/org_key=<tenant>`.
    pub artifact_prefix: String,
    pub pid_file: PathBuf,
    pub staging_dir: PathBuf,
    /// Syslog receiver for forwarded events and for our own logs.
    pub syslog_addr: String,
    pub log_level: String,
}

fn required(name: &str) -> anyhow::Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow::anyhow!("{name} environment variable is not set")),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn new() -> anyhow::Result<Config> {
        let access_key = required("CB_S3_KEY")?;
        let secret_key = required("CB_S3_SECRET")?;
        let bucket = required("CB_S3_BUCKET")?;
        let org_key = required("CB_ORG")?;
        let pid_file = PathBuf::from(required("CB_PID_FILE")?);

        let timeout_secs = match optional("CB_S3_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|err| {
                anyhow::anyhow!("CB_S3_TIMEOUT_SECS must be a number of seconds, got '{raw}': {err}")
            })?,
            None => DEFAULT_S3_TIMEOUT_SECS,
        };

        Ok(Config {
            s3: S3Config {
                access_key,
                secret_key,
                bucket,
                region: optional("CB_S3_REGION"),
                endpoint: optional("CB_S3_ENDPOINT"),
                operation_timeout: Duration::from_secs(timeout_secs),
            },
            org_key,
            artifact_prefix: optional("CB_S3_PREFIX")
                .map(|prefix| prefix.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ARTIFACT_PREFIX.to_string()),
            pid_file,
            staging_dir: optional("CB_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_DIR)),
            syslog_addr: optional("CB_SYSLOG_ADDR")
                .unwrap_or_else(|| DEFAULT_SYSLOG_ADDR.to_string()),
            log_level: optional("CB_LOG_LEVEL")
                .map(|level| level.to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Listing prefix for this tenant: `<prefix>/org_key=<tenant>`.
    #[must_use]
    pub fn tenant_prefix(&self) -> String {
        format!("{}/org_key={}", self.artifact_prefix, self.org_key)
    }
}
