// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Forwarding Rule Model
//!
//! A [`ForwardingRule`] describes one port forward the operator wants to
//! exist on the router, independent of which firewall node currently
//! receives it. Rules are static configuration: they are parsed once at
//! startup and never mutated afterwards.
//!
//! ## Identity
//! A rule is identified by `(external_port, protocol)`. The NAT device
//! keys its table the same way, so this pair is what removal and
//! duplicate detection operate on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport protocol of a forwarding rule, spelled the way the NAT
/// device spells it on the wire (`TCP` / `UDP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown protocol {0:?}, expected TCP or UDP")]
pub struct ParseProtocolError(String);

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            other => Err(ParseProtocolError(other.to_string())),
        }
    }
}

/// A single desired port forward.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForwardingRule {
    /// Port the router listens on.
    pub external_port: u16,

    /// Port the traffic is delivered to on the target address.
    pub internal_port: u16,

    pub protocol: Protocol,

    /// Free-form operator text, carried into the remote rule description.
    pub description: String,
}

impl ForwardingRule {
    /// The identity key shared with the remote NAT table.
    pub fn key(&self) -> (u16, Protocol) {
        (self.external_port, self.protocol)
    }
}

impl fmt::Display for ForwardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> :{} ({})",
            self.external_port, self.protocol, self.internal_port, self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(external: u16, protocol: Protocol) -> ForwardingRule {
        ForwardingRule {
            external_port: external,
            internal_port: external,
            protocol,
            description: "test".to_string(),
        }
    }

    #[test]
    fn protocol_displays_wire_spelling() {
        assert_eq!(Protocol::Tcp.to_string(), "TCP");
        assert_eq!(Protocol::Udp.to_string(), "UDP");
    }

    #[test]
    fn protocol_parses_case_insensitively() {
        assert_eq!("tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("UDP".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert!("ICMP".parse::<Protocol>().is_err());
    }

    #[test]
    fn key_distinguishes_protocols_on_same_port() {
        assert_ne!(rule(443, Protocol::Tcp).key(), rule(443, Protocol::Udp).key());
        assert_eq!(rule(443, Protocol::Tcp).key(), rule(443, Protocol::Tcp).key());
    }

    proptest! {
        #[test]
        fn protocol_display_roundtrips(p in prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp)]) {
            prop_assert_eq!(p.to_string().parse::<Protocol>().unwrap(), p);
        }
    }
}
