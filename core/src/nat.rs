// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Remote NAT Capability
//!
//! The [`NatClient`] trait is the only surface the reconciler knows
//! about: list the live table, remove an entry by key, add an entry.
//! The production implementation speaks TR-064 to the router; tests
//! substitute an in-memory table.
//!
//! ## Failure semantics
//! * `Ok(false)` from a mutation means the device processed the call
//!   and refused it — including "that entry does not exist", where the
//!   goal state is already met. Callers log and continue.
//! * `Err(NatError)` means the call never completed meaningfully.
//!   Protocol-level faults keep their code and description, but the
//!   core treats both variants the same way; the distinction exists for
//!   the logs.
//!
//! Every call is one network round trip against stateful equipment.
//! Nothing here is atomic across calls.

use async_trait::async_trait;
use thiserror::Error;

use vane_common::models::mapping::{MappingRequest, RemoteMapping};
use vane_common::models::rule::Protocol;

mod tr064;

pub use tr064::Tr064Client;

/// Upper bound for the table index scan, in case a misbehaving device
/// never answers "no such index".
pub const MAX_MAPPING_INDEX: u32 = 2048;

#[derive(Debug, Error)]
pub enum NatError {
    #[error("NAT transport failure: {0}")]
    Transport(String),

    #[error("NAT device fault {code}: {description}")]
    Device { code: String, description: String },
}

#[async_trait]
pub trait NatClient: Send + Sync {
    /// Reads the device's current table. The scan walks indices from 0
    /// and treats the device's first fault as the end of the table;
    /// only transport-level failures surface as errors.
    async fn list_mappings(&self) -> Result<Vec<RemoteMapping>, NatError>;

    /// Removes the entry keyed `(external_port, protocol)`. `Ok(false)`
    /// covers both refusal and "did not exist".
    async fn remove_mapping(&self, external_port: u16, protocol: Protocol)
    -> Result<bool, NatError>;

    /// Creates the described entry. `Ok(false)` means the device
    /// refused it.
    async fn add_mapping(&self, request: &MappingRequest) -> Result<bool, NatError>;
}
