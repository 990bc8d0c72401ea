// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Runtime Configuration
//!
//! The single immutable configuration value for a vane process. It is
//! read from a TOML file once at startup, validated, and then only ever
//! passed around by reference; there is deliberately no way to mutate it
//! afterwards.
//!
//! ## Validation policy
//! * Exactly two nodes, with distinct labels and control addresses.
//! * Rule identity keys `(external_port, protocol)` must be unique.
//! * An external port assigned to **both** nodes is rejected: it would
//!   allow a state where forwarding points at two masters at once.
//! * A rule assigned to **neither** node, or an assigned port with no
//!   matching rule, loads with a warning. Both are dead configuration,
//!   not hazards.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::models::node::Node;
use crate::models::rule::ForwardingRule;
use crate::warn;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Router management endpoint and its digest credential pair.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub address: IpAddr,
    pub username: String,
    pub password: String,
}

/// Credential pair for the firewall nodes' status API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds between detection cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    pub router: RouterConfig,
    pub status_api: ApiCredentials,

    /// The HA pair, in detection-priority order: when both nodes qualify
    /// through the degraded signal, the first one listed wins.
    pub nodes: Vec<Node>,

    /// The full desired rule set, independent of node assignment.
    pub rules: Vec<ForwardingRule>,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text: String = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(text).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.nodes.len() != 2 {
            bail!("expected exactly 2 nodes, found {}", self.nodes.len());
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }

        let (first, second) = (&self.nodes[0], &self.nodes[1]);
        if first.label == second.label {
            bail!("nodes must have distinct labels, both are {:?}", first.label);
        }
        if first.control_addr == second.control_addr {
            bail!("nodes must have distinct control addresses, both are {}", first.control_addr);
        }

        let mut seen_keys = HashSet::new();
        for rule in &self.rules {
            if !seen_keys.insert(rule.key()) {
                bail!("duplicate forwarding rule for {}/{}", rule.external_port, rule.protocol);
            }
        }

        let overlap: Vec<u16> = first
            .assigned_ports
            .intersection(&second.assigned_ports)
            .copied()
            .collect();
        if !overlap.is_empty() {
            bail!(
                "ports {:?} are assigned to both {} and {}; assignments must be disjoint",
                overlap,
                first.label,
                second.label
            );
        }

        self.warn_dead_entries();
        Ok(())
    }

    /// Non-fatal configuration smells.
    fn warn_dead_entries(&self) {
        let rule_ports: BTreeSet<u16> = self.rules.iter().map(|r| r.external_port).collect();
        let assigned: BTreeSet<u16> = self
            .nodes
            .iter()
            .flat_map(|n| n.assigned_ports.iter().copied())
            .collect();

        for rule in &self.rules {
            if !assigned.contains(&rule.external_port) {
                warn!("rule {rule} is assigned to neither node and will never be forwarded");
            }
        }
        for node in &self.nodes {
            for port in node.assigned_ports.difference(&rule_ports) {
                warn!("{} is assigned port {port} but no rule configures it", node.label);
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
