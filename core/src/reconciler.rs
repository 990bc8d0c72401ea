// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Reconciliation
//!
//! Turns "node X is now master" into NAT table operations. One pass:
//!
//! 1. Read the table once.
//! 2. Remove **every** configured key that is present — not just the
//!    ones that look wrong. The device may hold entries from a previous
//!    master under the same key, and a key must be fully cleared before
//!    it is re-added, globally: all removes happen before the first add
//!    so no port ever has entries for two masters at once.
//! 3. Add the rules assigned to the new master, pointing at its target
//!    address.
//!
//! Per-operation failures are logged and never abort the pass; a
//! failing port must not block the remaining ports. The pass as a whole
//! succeeds when at least one add succeeded — the documented contract,
//! even though it can declare success with most rules unapplied. Only a
//! pass in which every attempted add failed reports
//! [`ReconcileError::TotalFailure`], so the controller keeps the old
//! state and retries.
//!
//! Running the same pass twice against the same master is safe: it
//! deletes and recreates even when the table is already correct.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use vane_common::models::mapping::{MappingRequest, RemoteMapping};
use vane_common::models::node::Node;
use vane_common::models::rule::{ForwardingRule, Protocol};
use vane_common::{error, info, success, warn};

use crate::nat::{NatClient, NatError};

/// Breather between mutating calls; the device mishandles back-to-back
/// table writes.
pub const MUTATION_PAUSE: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read the current mapping table: {0}")]
    List(#[source] NatError),

    #[error("all {attempted} adds failed; the configured ports are currently unforwarded")]
    TotalFailure { attempted: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub removed: usize,
    pub added: usize,
    pub failed_adds: usize,
}

pub struct Reconciler {
    rules: Vec<ForwardingRule>,
    pause: Duration,
}

impl Reconciler {
    pub fn new(rules: Vec<ForwardingRule>) -> Self {
        Self {
            rules,
            pause: MUTATION_PAUSE,
        }
    }

    /// Tests run with a zero pause.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub async fn reconcile<C>(
        &self,
        previous: Option<&Node>,
        master: &Node,
        client: &C,
    ) -> Result<ReconcileOutcome, ReconcileError>
    where
        C: NatClient + ?Sized,
    {
        match previous {
            Some(prev) => info!("reconciling forwarding: {prev} -> {master}"),
            None => info!("reconciling forwarding toward {master}"),
        }

        let current: Vec<RemoteMapping> =
            client.list_mappings().await.map_err(ReconcileError::List)?;
        let live_keys: HashSet<(u16, Protocol)> = current.iter().map(RemoteMapping::key).collect();

        let mut outcome = ReconcileOutcome::default();

        for rule in &self.rules {
            if !live_keys.contains(&rule.key()) {
                continue;
            }
            match client.remove_mapping(rule.external_port, rule.protocol).await {
                Ok(true) => {
                    success!("removed {}/{}", rule.external_port, rule.protocol);
                    outcome.removed += 1;
                }
                Ok(false) => {
                    warn!("device refused removal of {}/{}", rule.external_port, rule.protocol);
                }
                Err(e) => {
                    warn!("removal of {}/{} failed: {e}", rule.external_port, rule.protocol);
                }
            }
            tokio::time::sleep(self.pause).await;
        }

        let mut attempted: usize = 0;
        for rule in &self.rules {
            if !master.handles_port(rule.external_port) {
                continue;
            }
            attempted += 1;

            let request: MappingRequest = MappingRequest::bind(rule, master);
            match client.add_mapping(&request).await {
                Ok(true) => {
                    success!(
                        "created {}/{} -> {}:{} for {}",
                        request.external_port,
                        request.protocol,
                        request.target_addr,
                        request.internal_port,
                        master.label
                    );
                    outcome.added += 1;
                }
                Ok(false) => {
                    error!(
                        "device refused {}/{} -> {}",
                        request.external_port, request.protocol, request.target_addr
                    );
                    outcome.failed_adds += 1;
                }
                Err(e) => {
                    error!(
                        "creating {}/{} -> {} failed: {e}",
                        request.external_port, request.protocol, request.target_addr
                    );
                    outcome.failed_adds += 1;
                }
            }
            tokio::time::sleep(self.pause).await;
        }

        if attempted == 0 {
            warn!("{master} has no assigned rules; nothing was forwarded");
            return Ok(outcome);
        }
        if outcome.added == 0 {
            return Err(ReconcileError::TotalFailure { attempted });
        }
        if outcome.failed_adds > 0 {
            warn!(
                "partial reconciliation: {} of {} rules applied for {master}",
                outcome.added, attempted
            );
        }

        Ok(outcome)
    }
}
