// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-shot batch forwarding of Carbon Black Defense event logs.
//!
//! A run lists the gzip-compressed, newline-delimited JSON artifacts staged in
//! S3 for a tenant, normalizes every record and hands it to a forwarding sink,
//! deleting each remote artifact once all of its records were forwarded.
//!
//! ```text
//!   Coordinator ── lock ── staging guard ── lister
//!        │
//!        └─ for each artifact: download → gunzip → decode → normalize → sink
//!                                                   └─ delete remote, delete local
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod hostname;
pub mod lock;
pub mod logger;
pub mod normalizer;
pub mod processor;
pub mod sink;
pub mod staging;
pub mod store;

/// Name the integration reports itself under, both in forwarded events and in its own logs.
pub const APP_NAME: &str = "cbdataforwarderEventLogs";
