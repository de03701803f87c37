// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Artifact and workspace fixtures

use std::io::Write;
use std::path::PathBuf;

use event_forwarder::coordinator::Coordinator;
use event_forwarder::normalizer::Normalizer;
use event_forwarder::staging::StagingArea;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

pub const TENANT_PREFIX: &str = "dsoffice/org_key=7DESJ9GN";

/// Gzip-compresses `lines`, one per line, newline-terminated.
pub fn gzip_lines(lines: &[&str]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        encoder.write_all(line.as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
    }
    encoder.finish().unwrap()
}

/// A raw Carbon Black event line.
pub fn event_line(id: &str, timestamp: &str) -> String {
    format!(
        r#"{{"type":"endpoint.event.procstart","event_id":"{id}","device_timestamp":"{timestamp}","process_hash":["{id}-hash"],"device_name":"WIN-{id}"}}"#
    )
}

pub fn artifact_key(name: &str) -> String {
    format!("{TENANT_PREFIX}/{name}")
}

/// Scratch directory holding the PID file and the staging area.
pub struct Workspace {
    pub root: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn pid_file(&self) -> PathBuf {
        self.root.path().join("forwarder.pid")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.path().join("datadir")
    }

    pub fn staging_entries(&self) -> Vec<String> {
        std::fs::read_dir(self.staging_dir())
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(
            self.pid_file(),
            StagingArea::new(self.staging_dir()),
            TENANT_PREFIX,
            Normalizer::default(),
        )
    }
}
