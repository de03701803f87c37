// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Normalization of Carbon Black event records to the destination schema.
//!
//! Every decoded record goes through two value fixups and a key rename:
//!
//! 1. `device_timestamp` (`"<date> <time>+<offset>"`) is cut at the first `+`,
//!    loses its last character and has its spaces replaced by `T`.
//! 2. `process_hash` holding a single-element array is unwrapped to that element.
//! 3. Keys are renamed through a [`FieldMappings`] table, in table order.
//!
//! The timestamp rewrite is a text transform, not a date parse. Downstream
//! parsing relies on its exact output, so it must stay byte-for-byte stable.

use serde_json::{Map, Value};

/// A decoded event record.
pub type EventRecord = Map<String, Value>;

pub const DEVICE_TIMESTAMP_FIELD: &str = "device_timestamp";
pub const PROCESS_HASH_FIELD: &str = "process_hash";

/// Ordered source-key to destination-key rename table.
///
/// Destination keys are not required to be unique: when two source keys
/// present in the same record map to one destination, the pair listed later
/// wins because renames are applied in table order.
#[derive(Debug, Clone, Copy)]
pub struct FieldMappings {
    pairs: &'static [(&'static str, &'static str)],
}

/// Mapping of Carbon Black Defense event fields to the collector schema.
///
/// `process_reputation` and `process_username` both land on `reputation`;
/// with this ordering `process_username` overwrites `process_reputation`.
pub const CB_DEFENSE_FIELD_MAPPINGS: FieldMappings = FieldMappings::new(&[
    ("type", "category"),
    ("device_external_ip", "external_ip"),
    ("device_os", "os_type"),
    ("process_reputation", "reputation"),
    ("process_username", "reputation"),
    ("sensor_action", "action"),
    ("process_cmdline", "command_line"),
    ("process_hash", "hash"),
    ("parent_cmdline", "parent_command_line"),
    ("parent_pid", "parent_process_id"),
    ("device_name", "hostname"),
    ("local_ip", "sensor_ip"),
    ("event_description", "message"),
    ("device_timestamp", "timestamp"),
]);

impl FieldMappings {
    #[must_use]
    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self { pairs }
    }

    #[must_use]
    pub fn pairs(&self) -> &'static [(&'static str, &'static str)] {
        self.pairs
    }

    /// Renames every mapped key present in `record`. Unmapped keys are untouched.
    pub fn apply(&self, record: &mut EventRecord) {
        for (from, to) in self.pairs {
            if let Some(value) = record.remove(*from) {
                record.insert((*to).to_string(), value);
            }
        }
    }
}

impl Default for FieldMappings {
    fn default() -> Self {
        CB_DEFENSE_FIELD_MAPPINGS
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    mappings: FieldMappings,
}

impl Normalizer {
    #[must_use]
    pub fn new(mappings: FieldMappings) -> Self {
        Self { mappings }
    }

    #[must_use]
    pub fn mappings(&self) -> &FieldMappings {
        &self.mappings
    }

    /// Applies the value fixups and then the key renames. Never fails: fields
    /// that are missing or of an unexpected shape pass through unchanged.
    #[must_use]
    pub fn normalize(&self, mut record: EventRecord) -> EventRecord {
        if let Some(Value::String(raw)) = record.get_mut(DEVICE_TIMESTAMP_FIELD) {
            *raw = truncate_device_timestamp(raw);
        }

        let single_hash = match record.get_mut(PROCESS_HASH_FIELD) {
            Some(Value::Array(hashes)) if hashes.len() == 1 => hashes.pop(),
            _ => None,
        };
        if let Some(hash) = single_hash {
            record.insert(PROCESS_HASH_FIELD.to_string(), hash);
        }

        self.mappings.apply(&mut record);
        record
    }
}

/// `"2020-01-02 03:04:05.678+0000"` becomes `"2020-01-02T03:04:05.67"`.
#[must_use]
pub fn truncate_device_timestamp(raw: &str) -> String {
    let before_offset = raw.split('+').next().unwrap_or_default();
    let mut chars = before_offset.chars();
    chars.next_back();
    chars.as_str().replace(' ', "T")
}
