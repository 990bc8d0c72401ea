// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # CARP Role Scan
//!
//! Decides whether a node's interface-status document claims the CARP
//! master role. The scan is deliberately schema-free: each interface
//! entry is serialized and searched, case-insensitively, for the
//! redundancy-protocol marker and the master-role marker together. A
//! firmware update that moves the role field around does not break the
//! scan; the trade-off is that this is a heuristic, not a structured
//! field read.

use serde_json::Value;

pub const REDUNDANCY_MARKER: &str = "carp";
pub const MASTER_MARKER: &str = "master";

/// `true` when any single interface entry mentions both markers.
///
/// Both markers must appear within the *same* entry: a box with a CARP
/// interface in BACKUP state plus an unrelated "master" string elsewhere
/// must not be declared master.
pub fn claims_master(document: &Value) -> bool {
    match document.as_object() {
        Some(interfaces) => interfaces.values().any(entry_claims_master),
        None => entry_claims_master(document),
    }
}

fn entry_claims_master(entry: &Value) -> bool {
    let text: String = entry.to_string().to_lowercase();
    text.contains(REDUNDANCY_MARKER) && text.contains(MASTER_MARKER)
}
