// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the forwarding pipeline.

use std::path::PathBuf;

/// Failures talking to the object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to connect to object store: {0}")]
    Connect(String),
    #[error("Failed to list objects under {prefix}: {message}")]
    List { prefix: String, message: String },
    #[error("Failed to download {key}: {message}")]
    Download { key: String, message: String },
    #[error("Failed to delete {key}: {message}")]
    Delete { key: String, message: String },
    #[error("Object {0} does not exist")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures delivering a record to a forwarding sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to deliver event: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single artifact could not be fully processed.
///
/// The remote artifact is left in place for every variant except `Delete`,
/// where all records were forwarded but the commit failed.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("download failed: {0}")]
    Download(#[source] StoreError),
    #[error("decompression failed at line {line}: {source}")]
    Decompress {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid event on line {line}: {message}")]
    Decode { line: usize, message: String },
    #[error("forwarding line {line} failed: {source}")]
    Forward {
        line: usize,
        #[source]
        source: SinkError,
    },
    #[error("remote delete failed: {0}")]
    Delete(#[source] StoreError),
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{} is not empty. A previous run might have failed", .0.display())]
    Precondition(PathBuf),
    #[error("Object store unavailable: {0}")]
    Connectivity(#[source] StoreError),
    #[error("Unhandled error: {0}")]
    Unhandled(String),
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Unhandled(err.to_string())
    }
}
