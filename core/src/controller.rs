// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Failover Controller
//!
//! The top-level loop: detect, compare against the recorded master,
//! reconcile on change. Strictly sequential — a cycle runs to
//! completion before the next starts, so the process state needs no
//! locking.
//!
//! State machine: `NoMaster` -> `MasterKnown(node)`, advancing only on
//! a reconciliation that genuinely succeeded. A tick that detects no
//! master leaves both the state and the live table untouched; tearing
//! down forwarding on a transient detection blip would itself be an
//! outage. A failed reconciliation keeps the previous state and the
//! next tick retries from scratch.

use std::future::Future;
use std::time::Duration;

use anyhow::bail;

use vane_common::models::node::Node;
use vane_common::{debug, error, info, success, warn};

use crate::detector::{DetectionSignal, Detector};
use crate::nat::NatClient;
use crate::reconciler::Reconciler;

/// Pause after a failed cycle before rejoining the tick cadence.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// The process-lifetime record of which node the NAT table was last
/// successfully pointed at. Never persisted: a restart re-detects and
/// re-applies, which is harmless by idempotence.
#[derive(Debug, Default)]
pub struct FailoverState {
    current_master: Option<Node>,
}

impl FailoverState {
    pub fn current(&self) -> Option<&Node> {
        self.current_master.as_ref()
    }

    fn record(&mut self, node: Node) {
        self.current_master = Some(node);
    }
}

pub struct FailoverController<D, C> {
    detector: D,
    client: C,
    reconciler: Reconciler,
    state: FailoverState,
    poll_interval: Duration,
}

impl<D, C> FailoverController<D, C>
where
    D: Detector,
    C: NatClient,
{
    pub fn new(detector: D, client: C, reconciler: Reconciler, poll_interval: Duration) -> Self {
        Self {
            detector,
            client,
            reconciler,
            state: FailoverState::default(),
            poll_interval,
        }
    }

    pub fn current_master(&self) -> Option<&Node> {
        self.state.current()
    }

    /// One detection-and-reconciliation cycle.
    pub async fn tick(&mut self) -> anyhow::Result<()> {
        let Some(signal) = self.detector.detect().await else {
            debug!(verbosity = 1, "no master detected; leaving forwarding untouched");
            return Ok(());
        };

        if self
            .state
            .current()
            .is_some_and(|current| current.is_same(signal.node()))
        {
            debug!(verbosity = 1, "{} is still master; nothing to do", signal.node());
            return Ok(());
        }

        self.apply(signal).await
    }

    /// Detects and reconciles unconditionally, even when the detected
    /// master matches the recorded one. Backs `vane sync` and covers
    /// the restart-re-applies behavior.
    pub async fn sync_once(&mut self) -> anyhow::Result<()> {
        match self.detector.detect().await {
            Some(signal) => self.apply(signal).await,
            None => bail!("no master is currently detectable"),
        }
    }

    async fn apply(&mut self, signal: DetectionSignal) -> anyhow::Result<()> {
        let quality: &str = signal.quality();
        let next: Node = signal.into_node();
        let previous: String = match self.state.current() {
            Some(node) => node.to_string(),
            None => "none".to_string(),
        };

        info!("failover: {previous} -> {next} [{quality} signal]");

        match self
            .reconciler
            .reconcile(self.state.current(), &next, &self.client)
            .await
        {
            Ok(outcome) => {
                success!(
                    "failover to {next} complete ({} removed, {} added)",
                    outcome.removed,
                    outcome.added
                );
                self.state.record(next);
                Ok(())
            }
            Err(e) => {
                // Deliberately do not record the new master: the next
                // tick must retry instead of treating this as settled.
                Err(anyhow::Error::new(e).context(format!("failover to {next} failed")))
            }
        }
    }

    /// Runs until `shutdown` resolves. Each tick failure is logged and
    /// absorbed; the loop itself never dies.
    pub async fn run<F>(mut self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        // One listing up front so broken router credentials surface at
        // startup instead of at the first failover.
        match self.client.list_mappings().await {
            Ok(mappings) => {
                success!("router connection verified, {} mappings present", mappings.len());
            }
            Err(e) => warn!("router connection check failed: {e}"),
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("cycle failed: {e:#}");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }

                _ = &mut shutdown => {
                    info!("shutdown requested, stopping failover loop");
                    break;
                }
            }
        }

        Ok(())
    }
}
