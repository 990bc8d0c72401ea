// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Firewall Node Model
//!
//! One member of the two-node high-availability pair. A node has two
//! distinct addresses: the **control address** its management API and
//! liveness probes talk to, and the **target address** that external
//! traffic should be forwarded to while this node is master.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Node {
    /// Address of the node's management/status interface.
    pub control_addr: IpAddr,

    /// Address forwarded traffic is delivered to when this node is master.
    pub target_addr: IpAddr,

    /// Operator-facing name, appended to remote rule descriptions.
    pub label: String,

    /// External ports that should forward to this node while it is master.
    pub assigned_ports: BTreeSet<u16>,
}

impl Node {
    /// Node identity. Two `Node` values describe the same physical node
    /// exactly when their control addresses match.
    pub fn is_same(&self, other: &Node) -> bool {
        self.control_addr == other.control_addr
    }

    pub fn handles_port(&self, external_port: u16) -> bool {
        self.assigned_ports.contains(&external_port)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.control_addr)
    }
}
