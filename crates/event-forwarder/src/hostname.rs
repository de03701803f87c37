// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname detection for the syslog header.

use std::env;
use tracing::warn;

/// Resolves the name written in the HOSTNAME field of syslog messages.
///
/// `CB_HOSTNAME` wins, then `HOSTNAME`, then `gethostname(2)`. Falls back to
/// `localhost` so a missing hostname never stops forwarding.
#[must_use]
pub fn get_hostname() -> String {
    for var in ["CB_HOSTNAME", "HOSTNAME"] {
        if let Ok(hostname) = env::var(var) {
            if !hostname.is_empty() {
                return hostname;
            }
        }
    }

    match nix::unistd::gethostname() {
        Ok(hostname_osstr) => {
            if let Some(hostname_str) = hostname_osstr.to_str() {
                if !hostname_str.is_empty() {
                    return hostname_str.to_string();
                }
            }
        }
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
        }
    }

    warn!("Could not determine hostname, using 'localhost'");
    "localhost".to_string()
}
