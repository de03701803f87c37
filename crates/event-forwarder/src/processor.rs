// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Processing of a single remote artifact.
//!
//! ```text
//!   download ─► gunzip ─► per line: decode ─► normalize ─► forward
//!                                                     │
//!                           all lines forwarded ──────┴─► delete remote
//!   (always) delete local staging file
//! ```
//!
//! Deleting the remote artifact is the commit point. It only happens after
//! every line was forwarded, so a failed artifact stays in the bucket and is
//! retried by the next run. Records forwarded before a failing line are not
//! recalled: delivery is at-least-once per artifact.
//!
//! The local staging file never gates a retry. It is removed whatever the
//! outcome; only a crash leaves it behind, which the staging guard detects.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::{debug, error, info, warn};

use crate::errors::{ArtifactError, StoreError};
use crate::normalizer::{EventRecord, Normalizer};
use crate::sink::EventSink;
use crate::staging::StagingArea;
use crate::store::{delete_idempotent, ArtifactRef, ObjectStore};

/// Result of processing one artifact.
#[derive(Debug)]
pub enum ArtifactOutcome {
    /// Every record was forwarded and the remote artifact deleted.
    Forwarded { records: usize },
    /// Processing stopped; the remote artifact is left in place unless the
    /// failure was the delete itself.
    Failed {
        error: ArtifactError,
        /// Records handed to the sink before the failure.
        records_forwarded: usize,
    },
}

impl ArtifactOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ArtifactOutcome::Forwarded { .. })
    }
}

pub struct ArtifactProcessor<'a> {
    store: &'a dyn ObjectStore,
    sink: &'a dyn EventSink,
    normalizer: Normalizer,
    staging: &'a StagingArea,
}

impl<'a> ArtifactProcessor<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn ObjectStore,
        sink: &'a dyn EventSink,
        normalizer: Normalizer,
        staging: &'a StagingArea,
    ) -> Self {
        Self {
            store,
            sink,
            normalizer,
            staging,
        }
    }

    /// Processes `artifact` end to end. Never returns an error: every failure
    /// is logged and reported through [`ArtifactOutcome::Failed`].
    pub async fn process(&self, artifact: &ArtifactRef) -> ArtifactOutcome {
        let local_path = self.staging.local_path(artifact.key());
        let mut forwarded = 0usize;

        let result = self
            .download_and_forward(artifact, &local_path, &mut forwarded)
            .await;
        remove_local(&local_path);

        match result {
            Ok(()) => {
                info!("Forwarded {} events from {}", forwarded, artifact);
                ArtifactOutcome::Forwarded { records: forwarded }
            }
            Err(error) => {
                error!("Error handling file {}: {}", artifact, error);
                ArtifactOutcome::Failed {
                    error,
                    records_forwarded: forwarded,
                }
            }
        }
    }

    async fn download_and_forward(
        &self,
        artifact: &ArtifactRef,
        local_path: &Path,
        forwarded: &mut usize,
    ) -> Result<(), ArtifactError> {
        info!("Downloading file: {}", artifact);
        self.store
            .download(artifact.key(), local_path)
            .await
            .map_err(ArtifactError::Download)?;

        info!("Processing file {}", local_path.display());
        let file = File::open(local_path)
            .map_err(|e| ArtifactError::Download(StoreError::Io(e)))?;
        let len = file
            .metadata()
            .map_err(|e| ArtifactError::Download(StoreError::Io(e)))?
            .len();
        if len == 0 {
            // Folder markers and empty uploads hold no records; not a gzip stream.
            debug!("{} is empty, nothing to forward", artifact);
        } else {
            // Blocking reads, on the run's current-thread runtime.
            let reader = BufReader::new(MultiGzDecoder::new(file));
            self.forward_lines(reader, forwarded).await?;
        }

        info!("Deleting s3 object {}", artifact);
        delete_idempotent(self.store, artifact.key())
            .await
            .map_err(ArtifactError::Delete)
    }

    async fn forward_lines<R: BufRead>(
        &self,
        reader: R,
        forwarded: &mut usize,
    ) -> Result<(), ArtifactError> {
        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line.map_err(|source| ArtifactError::Decompress {
                line: line_number,
                source,
            })?;
            let record = decode_record(&line).map_err(|message| ArtifactError::Decode {
                line: line_number,
                message,
            })?;
            let normalized = self.normalizer.normalize(record);
            self.sink
                .forward(&normalized)
                .await
                .map_err(|source| ArtifactError::Forward {
                    line: line_number,
                    source,
                })?;
            *forwarded += 1;
        }
        Ok(())
    }
}

fn decode_record(line: &str) -> Result<EventRecord, String> {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(serde_json::Value::Object(record)) => Ok(record),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn remove_local(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed staging file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove staging file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_objects_only() {
        assert!(decode_record(r#"{"type":"endpoint.event.procstart"}"#).is_ok());
        assert_eq!(
            decode_record("[1,2]").unwrap_err(),
            "expected a JSON object, got an array"
        );
        assert_eq!(
            decode_record("\"x\"").unwrap_err(),
            "expected a JSON object, got a string"
        );
        assert!(decode_record("").is_err());
        assert!(decode_record("{\"truncated\": ").is_err());
    }

    #[test]
    fn test_remove_local_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        remove_local(&dir.path().join("never-downloaded.gz"));
    }

    #[test]
    fn test_outcome_success_flag() {
        assert!(ArtifactOutcome::Forwarded { records: 0 }.is_success());
        assert!(!ArtifactOutcome::Failed {
            error: ArtifactError::Decode {
                line: 1,
                message: "bad".to_string()
            },
            records_forwarded: 0
        }
        .is_success());
    }
}
