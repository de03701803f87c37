// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock implementations of the object store and forwarding sink

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use event_forwarder::errors::{SinkError, StoreError};
use event_forwarder::normalizer::EventRecord;
use event_forwarder::sink::EventSink;
use event_forwarder::store::ObjectStore;

/// In-memory bucket. Listing returns keys in insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    pub list_calls: Arc<AtomicUsize>,
    pub downloads: Arc<Mutex<Vec<String>>>,
    pub deletes: Arc<Mutex<Vec<String>>>,
    /// Listing fails as if the bucket were unreachable.
    pub fail_list: bool,
    /// Deletes report the object as already gone.
    pub delete_reports_missing: bool,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn with_objects(objects: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            objects: Arc::new(Mutex::new(objects)),
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().iter().any(|(k, _)| k == key)
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(StoreError::List {
                prefix: prefix.to_string(),
                message: "InvalidAccessKeyId".to_string(),
            });
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<(), StoreError> {
        self.downloads.lock().unwrap().push(key.to_string());
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        std::fs::write(destination, bytes)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().retain(|(k, _)| k != key);
        if self.delete_reports_missing {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

/// Records every forwarded event; optionally fails the n-th call (1-based).
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<EventRecord>>,
    calls: AtomicUsize,
    pub fail_on_call: Option<usize>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_ids(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["event_id"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn forward(&self, record: &EventRecord) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "syslog receiver down",
            )));
        }
        self.events.lock().unwrap().push(record.clone());
        Ok(())
    }
}
