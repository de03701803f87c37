// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Run Coordinator: drives one batch from lock acquisition to the last artifact.
//!
//! Order of a run:
//! 1. take the process lock, or report [`RunOutcome::AlreadyRunning`]
//! 2. refuse to start if the staging area holds leftovers
//! 3. connect to the store and list the tenant's artifacts
//! 4. process artifacts in listing order, halting at the first failure
//!
//! Nothing touches the network before steps 1 and 2 have passed.

use std::future::Future;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::{ArtifactError, RunError, StoreError};
use crate::lock::ProcessLock;
use crate::normalizer::Normalizer;
use crate::processor::{ArtifactOutcome, ArtifactProcessor};
use crate::sink::EventSink;
use crate::staging::StagingArea;
use crate::store::{list_artifacts, ArtifactRef, ObjectStore};

#[derive(Debug)]
pub enum RunOutcome {
    /// Another instance holds the lock. Nothing was touched.
    AlreadyRunning,
    /// Every listed artifact was forwarded and deleted.
    Completed { artifacts: usize, records: usize },
    /// Stopped at `failed`; it and every artifact listed after it remain
    /// in the store for the next run.
    Halted {
        artifacts: usize,
        records: usize,
        failed: ArtifactRef,
        error: ArtifactError,
    },
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    pid_file: PathBuf,
    staging: StagingArea,
    tenant_prefix: String,
    normalizer: Normalizer,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        pid_file: impl Into<PathBuf>,
        staging: StagingArea,
        tenant_prefix: impl Into<String>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            pid_file: pid_file.into(),
            staging,
            tenant_prefix: tenant_prefix.into(),
            normalizer,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.pid_file.clone(),
            StagingArea::new(config.staging_dir.clone()),
            config.tenant_prefix(),
            Normalizer::default(),
        )
    }

    /// Runs one batch. `connect` is only invoked once the lock is held and the
    /// staging area was found empty.
    pub async fn run<S, C, Fut>(&self, connect: C, sink: &dyn EventSink) -> Result<RunOutcome, RunError>
    where
        S: ObjectStore,
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, StoreError>>,
    {
        let Some(_lock) = ProcessLock::try_acquire(&self.pid_file)? else {
            warn!(
                "An instance of the forwarder is already running (lock {} held)",
                self.pid_file.display()
            );
            return Ok(RunOutcome::AlreadyRunning);
        };

        self.staging.ensure_empty()?;

        let store = connect().await.map_err(RunError::Connectivity)?;
        let artifacts = list_artifacts(&store, &self.tenant_prefix)
            .await
            .map_err(RunError::Connectivity)?;

        let processor = ArtifactProcessor::new(&store, sink, self.normalizer, &self.staging);
        let mut forwarded_artifacts = 0usize;
        let mut forwarded_records = 0usize;

        for artifact in artifacts {
            match processor.process(&artifact).await {
                ArtifactOutcome::Forwarded { records } => {
                    forwarded_artifacts += 1;
                    forwarded_records += records;
                }
                ArtifactOutcome::Failed {
                    error,
                    records_forwarded,
                } => {
                    error!("Failed to process file: {}", artifact);
                    return Ok(RunOutcome::Halted {
                        artifacts: forwarded_artifacts,
                        records: forwarded_records + records_forwarded,
                        failed: artifact,
                        error,
                    });
                }
            }
        }

        info!(
            "Run complete: {} artifacts, {} events forwarded",
            forwarded_artifacts, forwarded_records
        );
        Ok(RunOutcome::Completed {
            artifacts: forwarded_artifacts,
            records: forwarded_records,
        })
    }
}
