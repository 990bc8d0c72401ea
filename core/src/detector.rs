// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Master Detection
//!
//! Works out which node of the pair is currently master, from two
//! signals of very different quality:
//!
//! 1. **Confirmed** — the node's status endpoint answered and its
//!    interface document claims the CARP master role.
//! 2. **Degraded** — the status endpoint was unusable, but the node
//!    answered a plain liveness probe. This is a deliberate fail-open
//!    choice: failover still happens when the status API is down, at
//!    the price of false positives when a node is up without actually
//!    holding the master role. The signal is tagged so callers and
//!    tests can treat it separately.
//!
//! Nodes are evaluated in configured order and the first qualifying one
//! wins, which intentionally gives earlier-listed nodes priority when
//! both would qualify through the degraded path. A node whose status
//! endpoint answers *without* the master markers is disqualified
//! outright; the probe fallback only applies when the endpoint itself
//! failed.

use std::net::IpAddr;

use async_trait::async_trait;

use vane_common::models::node::Node;
use vane_common::{debug, success, warn};

/// What a node's status endpoint said about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Master,
    Backup,
}

/// Per-node status query. Errors mean "the endpoint could not be
/// consulted" and trigger the degraded fallback; they are never fatal.
#[async_trait]
pub trait StatusSource {
    async fn role(&self, node: &Node) -> anyhow::Result<NodeRole>;
}

/// Network-level liveness check, the degraded fallback signal.
#[async_trait]
pub trait ReachabilityProbe {
    async fn is_reachable(&self, addr: IpAddr) -> bool;
}

/// A detection result, tagged with the quality of the evidence.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionSignal {
    Confirmed(Node),
    Degraded(Node),
}

impl DetectionSignal {
    pub fn node(&self) -> &Node {
        match self {
            DetectionSignal::Confirmed(node) | DetectionSignal::Degraded(node) => node,
        }
    }

    pub fn into_node(self) -> Node {
        match self {
            DetectionSignal::Confirmed(node) | DetectionSignal::Degraded(node) => node,
        }
    }

    pub fn quality(&self) -> &'static str {
        match self {
            DetectionSignal::Confirmed(_) => "confirmed",
            DetectionSignal::Degraded(_) => "degraded",
        }
    }
}

/// Anything that can answer "who is master right now?". The controller
/// only depends on this, so tests can script detection outcomes.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self) -> Option<DetectionSignal>;
}

pub struct MasterDetector<S, P> {
    nodes: Vec<Node>,
    status: S,
    probe: P,
}

impl<S, P> MasterDetector<S, P>
where
    S: StatusSource + Send + Sync,
    P: ReachabilityProbe + Send + Sync,
{
    /// `nodes` in detection-priority order, as configured.
    pub fn new(nodes: Vec<Node>, status: S, probe: P) -> Self {
        Self { nodes, status, probe }
    }
}

#[async_trait]
impl<S, P> Detector for MasterDetector<S, P>
where
    S: StatusSource + Send + Sync,
    P: ReachabilityProbe + Send + Sync,
{
    async fn detect(&self) -> Option<DetectionSignal> {
        for node in &self.nodes {
            match self.status.role(node).await {
                Ok(NodeRole::Master) => {
                    success!("{node} reports CARP master");
                    return Some(DetectionSignal::Confirmed(node.clone()));
                }
                Ok(NodeRole::Backup) => {
                    debug!(verbosity = 1, "{node} is reachable but not master");
                }
                Err(e) => {
                    debug!(verbosity = 1, "status query for {node} failed: {e:#}");
                    if self.probe.is_reachable(node.control_addr).await {
                        warn!(
                            "{node} answers liveness probes only; treating it as master (degraded signal)"
                        );
                        return Some(DetectionSignal::Degraded(node.clone()));
                    }
                }
            }
        }

        None
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Mutex};

    fn node(last_octet: u8, label: &str) -> Node {
        Node {
            control_addr: IpAddr::V4(Ipv4Addr::new(10, 1, 1, last_octet)),
            target_addr: IpAddr::V4(Ipv4Addr::new(192, 168, 178, last_octet)),
            label: label.to_string(),
            assigned_ports: BTreeSet::new(),
        }
    }

    #[derive(Clone, Copy)]
    enum Scripted {
        Master,
        Backup,
        Unreachable,
    }

    struct ScriptedStatus {
        outcomes: HashMap<IpAddr, Scripted>,
    }

    impl ScriptedStatus {
        fn new(outcomes: &[(IpAddr, Scripted)]) -> Self {
            Self {
                outcomes: outcomes.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedStatus {
        async fn role(&self, node: &Node) -> anyhow::Result<NodeRole> {
            match self.outcomes.get(&node.control_addr) {
                Some(Scripted::Master) => Ok(NodeRole::Master),
                Some(Scripted::Backup) => Ok(NodeRole::Backup),
                _ => anyhow::bail!("request timed out"),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingProbe {
        reachable: HashSet<IpAddr>,
        probed: Arc<Mutex<Vec<IpAddr>>>,
    }

    impl RecordingProbe {
        fn reachable(addrs: &[IpAddr]) -> Self {
            Self {
                reachable: addrs.iter().copied().collect(),
                probed: Arc::default(),
            }
        }

        fn probed(&self) -> Vec<IpAddr> {
            self.probed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReachabilityProbe for RecordingProbe {
        async fn is_reachable(&self, addr: IpAddr) -> bool {
            self.probed.lock().unwrap().push(addr);
            self.reachable.contains(&addr)
        }
    }

    #[tokio::test]
    async fn confirmed_master_is_found_behind_a_dead_node() {
        // Node A's status query times out and A is fully down; node B
        // answers and reports master. B must win without B ever being
        // probed.
        let a = node(3, "fw-alpha");
        let b = node(4, "fw-beta");
        let status = ScriptedStatus::new(&[
            (a.control_addr, Scripted::Unreachable),
            (b.control_addr, Scripted::Master),
        ]);
        let probe = RecordingProbe::reachable(&[]);

        let detector = MasterDetector::new(vec![a.clone(), b.clone()], status, probe.clone());
        let signal = detector.detect().await.unwrap();

        assert_eq!(signal, DetectionSignal::Confirmed(b.clone()));
        assert_eq!(probe.probed(), vec![a.control_addr]);
    }

    #[tokio::test]
    async fn probe_fallback_elects_the_reachable_node() {
        let a = node(3, "fw-alpha");
        let b = node(4, "fw-beta");
        let status = ScriptedStatus::new(&[
            (a.control_addr, Scripted::Unreachable),
            (b.control_addr, Scripted::Unreachable),
        ]);
        let probe = RecordingProbe::reachable(&[a.control_addr]);

        let detector = MasterDetector::new(vec![a.clone(), b], status, probe.clone());
        let signal = detector.detect().await.unwrap();

        assert_eq!(signal, DetectionSignal::Degraded(a));
    }

    #[tokio::test]
    async fn earlier_node_wins_when_both_degrade() {
        let a = node(3, "fw-alpha");
        let b = node(4, "fw-beta");
        let status = ScriptedStatus::new(&[
            (a.control_addr, Scripted::Unreachable),
            (b.control_addr, Scripted::Unreachable),
        ]);
        let probe = RecordingProbe::reachable(&[a.control_addr, b.control_addr]);

        let detector = MasterDetector::new(vec![a.clone(), b.clone()], status, probe.clone());
        let signal = detector.detect().await.unwrap();

        // The scan stops at the first match: B is never probed.
        assert_eq!(probe.probed(), vec![a.control_addr]);
        assert_eq!(signal, DetectionSignal::Degraded(a));
    }

    #[tokio::test]
    async fn backup_answer_disqualifies_without_probing() {
        let a = node(3, "fw-alpha");
        let b = node(4, "fw-beta");
        let status = ScriptedStatus::new(&[
            (a.control_addr, Scripted::Backup),
            (b.control_addr, Scripted::Master),
        ]);
        // A *would* answer a probe, but a healthy "I am backup" answer
        // must never be upgraded to master via the fallback.
        let probe = RecordingProbe::reachable(&[a.control_addr]);

        let detector = MasterDetector::new(vec![a, b.clone()], status, probe.clone());
        let signal = detector.detect().await.unwrap();

        assert_eq!(signal, DetectionSignal::Confirmed(b));
        assert!(probe.probed().is_empty());
    }

    #[tokio::test]
    async fn nothing_qualifies_when_the_pair_is_dark() {
        let a = node(3, "fw-alpha");
        let b = node(4, "fw-beta");
        let status = ScriptedStatus::new(&[
            (a.control_addr, Scripted::Unreachable),
            (b.control_addr, Scripted::Unreachable),
        ]);
        let probe = RecordingProbe::reachable(&[]);

        let detector = MasterDetector::new(vec![a, b], status, probe.clone());
        assert_eq!(detector.detect().await, None);
    }
}
