// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Remote NAT Table Entries
//!
//! [`RemoteMapping`] is one live entry read back from the NAT device. It
//! is not owned by vane: it is the external state the reconciler drives
//! toward the configured rule set. [`MappingRequest`] is the write-side
//! counterpart, fully describing one entry to create.

use std::fmt;
use std::net::IpAddr;

use crate::models::node::Node;
use crate::models::rule::{ForwardingRule, Protocol};

/// One port-forwarding entry as reported by the NAT device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMapping {
    pub external_port: u16,
    pub protocol: Protocol,
    pub internal_port: u16,

    /// Address the device currently delivers this port to.
    pub target_addr: IpAddr,

    pub description: String,

    /// Position in the device's table at the time of the listing. Only
    /// meaningful within that one listing; the device renumbers freely.
    pub index: u32,
}

impl RemoteMapping {
    pub fn key(&self) -> (u16, Protocol) {
        (self.external_port, self.protocol)
    }
}

impl fmt::Display for RemoteMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}:{} ({})",
            self.external_port, self.protocol, self.target_addr, self.internal_port, self.description
        )
    }
}

/// Everything needed to create one entry on the NAT device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    pub external_port: u16,
    pub internal_port: u16,
    pub protocol: Protocol,
    pub target_addr: IpAddr,
    pub description: String,
}

impl MappingRequest {
    /// Binds a configured rule to a concrete master node. The remote
    /// description carries the node label so the table's history can be
    /// reconstructed from the device side as well as from logs.
    pub fn bind(rule: &ForwardingRule, master: &Node) -> Self {
        Self {
            external_port: rule.external_port,
            internal_port: rule.internal_port,
            protocol: rule.protocol,
            target_addr: master.target_addr,
            description: format!("{} ({})", rule.description, master.label),
        }
    }
}
