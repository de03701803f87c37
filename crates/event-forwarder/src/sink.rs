// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwarding sinks receiving normalized event records.
//!
//! Delivery is fire-and-forget per record: no batching and no acknowledgment.
//! A sink error only means the record could not be handed off locally.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Local;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::errors::SinkError;
use crate::normalizer::EventRecord;

/// Syslog facilities used by the forwarder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    /// Our own operational logs.
    Local6 = 22,
    /// Forwarded events.
    Local7 = 23,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error = 3,
    Warning = 4,
    Info = 6,
    Debug = 7,
}

/// Frames `message` as an RFC 3164 syslog line: `<PRI>Mmm dd hh:mm:ss host tag: message`.
#[must_use]
pub fn rfc3164_frame(
    facility: Facility,
    severity: Severity,
    hostname: &str,
    tag: &str,
    message: &str,
) -> String {
    let priority = (facility as u8) * 8 + severity as u8;
    format!(
        "<{priority}>{} {hostname} {tag}: {message}",
        Local::now().format("%b %e %H:%M:%S")
    )
}

/// Largest UDP payload over IPv4. Longer lines cannot be sent as one datagram.
pub const MAX_DATAGRAM_LEN: usize = 65_507;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn forward(&self, record: &EventRecord) -> Result<(), SinkError>;
}

/// Sends each record as JSON in one syslog datagram, facility LOCAL7.
pub struct SyslogSink {
    socket: UdpSocket,
    hostname: String,
    tag: String,
}

impl SyslogSink {
    pub async fn new(addr: &str, hostname: String, tag: &str) -> Result<Self, SinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        info!("Forwarding events to syslog at {}", addr);
        Ok(Self {
            socket,
            hostname,
            tag: tag.to_string(),
        })
    }
}

#[async_trait]
impl EventSink for SyslogSink {
    async fn forward(&self, record: &EventRecord) -> Result<(), SinkError> {
        let payload = serde_json::to_string(record)?;
        let line = rfc3164_frame(
            Facility::Local7,
            Severity::Info,
            &self.hostname,
            &self.tag,
            &payload,
        );
        if line.len() > MAX_DATAGRAM_LEN {
            warn!(
                "Dropping event of {} bytes, larger than one syslog datagram ({} bytes)",
                line.len(),
                MAX_DATAGRAM_LEN
            );
            return Ok(());
        }
        self.socket.send(line.as_bytes()).await?;
        Ok(())
    }
}

/// Testing mode sink: appends one JSON line per record to a local file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Creates `output.<YYYYmmdd-HHMMSS>` inside `dir`.
    pub fn timestamped(dir: &Path) -> Result<Self, SinkError> {
        let name = format!("output.{}", Local::now().format("%Y%m%d-%H%M%S"));
        Self::new(dir.join(name))
    }

    pub fn new(path: PathBuf) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Testing mode: writing events to {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSink for FileSink {
    async fn forward(&self, record: &EventRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("output file lock poisoned"))?;
        file.write_all(&line)?;
        debug!("Wrote {} bytes to {}", line.len(), self.path.display());
        Ok(())
    }
}
