// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

#![cfg(test)]

//! End-to-end controller scenarios against a simulated router table and
//! scripted detection outcomes. No network, no timing: the pause
//! between mutations is zeroed and detection results are queued up
//! front.

use std::collections::{BTreeSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vane_common::models::mapping::{MappingRequest, RemoteMapping};
use vane_common::models::node::Node;
use vane_common::models::rule::{ForwardingRule, Protocol};
use vane_core::controller::FailoverController;
use vane_core::detector::{DetectionSignal, Detector};
use vane_core::nat::{NatClient, NatError};
use vane_core::reconciler::Reconciler;

/// In-memory stand-in for the router's NAT table. Clones share state so
/// a test keeps its handle after the controller takes the client.
#[derive(Clone, Default)]
struct SimRouter {
    inner: Arc<Mutex<SimTable>>,
}

#[derive(Default)]
struct SimTable {
    entries: Vec<RemoteMapping>,
    fail_add_ports: BTreeSet<u16>,
    mutations: usize,
}

impl SimRouter {
    fn new() -> Self {
        Self::default()
    }

    fn fail_adds_for(&self, ports: &[u16]) {
        self.inner.lock().unwrap().fail_add_ports = ports.iter().copied().collect();
    }

    fn entries(&self) -> Vec<RemoteMapping> {
        self.inner.lock().unwrap().entries.clone()
    }

    fn ports(&self) -> BTreeSet<(u16, Protocol)> {
        self.entries().iter().map(RemoteMapping::key).collect()
    }

    fn mutations(&self) -> usize {
        self.inner.lock().unwrap().mutations
    }
}

#[async_trait]
impl NatClient for SimRouter {
    async fn list_mappings(&self) -> Result<Vec<RemoteMapping>, NatError> {
        let table = self.inner.lock().unwrap();
        Ok(table
            .entries
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, mut entry)| {
                entry.index = i as u32;
                entry
            })
            .collect())
    }

    async fn remove_mapping(
        &self,
        external_port: u16,
        protocol: Protocol,
    ) -> Result<bool, NatError> {
        let mut table = self.inner.lock().unwrap();
        table.mutations += 1;
        let before = table.entries.len();
        table
            .entries
            .retain(|entry| entry.key() != (external_port, protocol));
        Ok(table.entries.len() < before)
    }

    async fn add_mapping(&self, request: &MappingRequest) -> Result<bool, NatError> {
        let mut table = self.inner.lock().unwrap();
        table.mutations += 1;
        if table.fail_add_ports.contains(&request.external_port) {
            return Ok(false);
        }
        let index = table.entries.len() as u32;
        table.entries.push(RemoteMapping {
            external_port: request.external_port,
            protocol: request.protocol,
            internal_port: request.internal_port,
            target_addr: request.target_addr,
            description: request.description.clone(),
            index,
        });
        Ok(true)
    }
}

struct ScriptedDetector {
    signals: Mutex<VecDeque<Option<DetectionSignal>>>,
}

impl ScriptedDetector {
    fn new(signals: Vec<Option<DetectionSignal>>) -> Self {
        Self {
            signals: Mutex::new(signals.into()),
        }
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self) -> Option<DetectionSignal> {
        self.signals.lock().unwrap().pop_front().flatten()
    }
}

fn node(last_octet: u8, label: &str, ports: &[u16]) -> Node {
    Node {
        control_addr: IpAddr::V4(Ipv4Addr::new(10, 1, 1, last_octet)),
        target_addr: IpAddr::V4(Ipv4Addr::new(192, 168, 178, last_octet)),
        label: label.to_string(),
        assigned_ports: ports.iter().copied().collect(),
    }
}

fn rule(port: u16, description: &str) -> ForwardingRule {
    ForwardingRule {
        external_port: port,
        internal_port: port,
        protocol: Protocol::Tcp,
        description: description.to_string(),
    }
}

fn controller(
    rules: Vec<ForwardingRule>,
    signals: Vec<Option<DetectionSignal>>,
    router: SimRouter,
) -> FailoverController<ScriptedDetector, SimRouter> {
    FailoverController::new(
        ScriptedDetector::new(signals),
        router,
        Reconciler::new(rules).with_pause(Duration::ZERO),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn forwarding_follows_the_master_across_a_switch() {
    // The canonical two-node split: 443 belongs to alpha, 8443 to beta.
    let alpha = node(3, "fw-alpha", &[443]);
    let beta = node(4, "fw-beta", &[8443]);
    let rules = vec![rule(443, "HTTPS"), rule(8443, "HTTPS alt")];
    let router = SimRouter::new();

    let mut controller = controller(
        rules,
        vec![
            Some(DetectionSignal::Confirmed(alpha.clone())),
            Some(DetectionSignal::Confirmed(beta.clone())),
        ],
        router.clone(),
    );

    controller.tick().await.unwrap();
    assert_eq!(router.ports(), BTreeSet::from([(443, Protocol::Tcp)]));
    assert_eq!(router.entries()[0].target_addr, alpha.target_addr);

    controller.tick().await.unwrap();
    assert_eq!(router.ports(), BTreeSet::from([(8443, Protocol::Tcp)]));
    assert_eq!(router.entries()[0].target_addr, beta.target_addr);
}

#[tokio::test]
async fn dark_ticks_leave_state_and_table_untouched() {
    let alpha = node(3, "fw-alpha", &[443]);
    let router = SimRouter::new();

    let mut controller = controller(
        vec![rule(443, "HTTPS")],
        vec![Some(DetectionSignal::Confirmed(alpha.clone())), None, None],
        router.clone(),
    );

    controller.tick().await.unwrap();
    let table = router.entries();
    let mutations = router.mutations();

    controller.tick().await.unwrap();
    controller.tick().await.unwrap();

    assert!(controller.current_master().is_some_and(|m| m.is_same(&alpha)));
    assert_eq!(router.entries(), table);
    assert_eq!(router.mutations(), mutations);
}

#[tokio::test]
async fn a_restart_reapplies_the_same_master() {
    let alpha = node(3, "fw-alpha", &[443]);
    let router = SimRouter::new();

    let mut first = controller(
        vec![rule(443, "HTTPS")],
        vec![Some(DetectionSignal::Confirmed(alpha.clone()))],
        router.clone(),
    );
    first.tick().await.unwrap();
    let mutations_before = router.mutations();
    drop(first);

    // Fresh process state: the same master looks like a change again,
    // so the rules are deleted and recreated. Same table afterwards.
    let mut second = controller(
        vec![rule(443, "HTTPS")],
        vec![Some(DetectionSignal::Confirmed(alpha.clone()))],
        router.clone(),
    );
    second.tick().await.unwrap();

    assert!(router.mutations() > mutations_before);
    assert_eq!(router.ports(), BTreeSet::from([(443, Protocol::Tcp)]));
    assert_eq!(router.entries()[0].target_addr, alpha.target_addr);
}

#[tokio::test]
async fn degraded_detection_still_moves_forwarding() {
    let alpha = node(3, "fw-alpha", &[443]);
    let beta = node(4, "fw-beta", &[8443]);
    let router = SimRouter::new();

    let mut controller = controller(
        vec![rule(443, "HTTPS"), rule(8443, "HTTPS alt")],
        vec![
            Some(DetectionSignal::Confirmed(alpha)),
            Some(DetectionSignal::Degraded(beta.clone())),
        ],
        router.clone(),
    );

    controller.tick().await.unwrap();
    controller.tick().await.unwrap();

    assert!(controller.current_master().is_some_and(|m| m.is_same(&beta)));
    assert_eq!(router.ports(), BTreeSet::from([(8443, Protocol::Tcp)]));
}

#[tokio::test]
async fn partial_add_failure_is_success_by_contract() {
    // Beta owns both ports but the router refuses one of the adds. The
    // documented contract says one success is enough: the switch is
    // recorded, the refused port simply stays unforwarded.
    let alpha = node(3, "fw-alpha", &[443]);
    let beta = node(4, "fw-beta", &[443, 8443]);
    let router = SimRouter::new();

    let mut controller = controller(
        vec![rule(443, "HTTPS"), rule(8443, "HTTPS alt")],
        vec![
            Some(DetectionSignal::Confirmed(alpha)),
            Some(DetectionSignal::Confirmed(beta.clone())),
        ],
        router.clone(),
    );

    controller.tick().await.unwrap();
    router.fail_adds_for(&[8443]);

    controller.tick().await.unwrap();

    assert!(controller.current_master().is_some_and(|m| m.is_same(&beta)));
    assert_eq!(router.ports(), BTreeSet::from([(443, Protocol::Tcp)]));
    assert_eq!(router.entries()[0].target_addr, beta.target_addr);
}
