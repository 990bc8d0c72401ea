// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Liveness probing for the degraded detection signal.
//!
//! Privilege aware: with root, one ICMPv4 echo over a raw transport
//! channel; without root (or for IPv6 control addresses), a TCP connect
//! attempt against the node's HTTPS port. For the TCP path, any answer
//! counts — a connection refusal still proves the host's stack is up,
//! which is all the degraded signal claims.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use is_root::is_root;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{self, TransportChannelType, TransportProtocol};
use tokio::net::TcpStream;
use tokio::time::timeout;

use vane_common::debug;
use vane_protocols::icmp;

use crate::detector::ReachabilityProbe;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const FALLBACK_PROBE_PORT: u16 = 443;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

/// The production [`ReachabilityProbe`].
#[derive(Default)]
pub struct LivenessProbe;

impl LivenessProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReachabilityProbe for LivenessProbe {
    async fn is_reachable(&self, addr: IpAddr) -> bool {
        if is_root() && addr.is_ipv4() {
            match icmp_probe(addr).await {
                Ok(answered) => return answered,
                Err(e) => {
                    debug!(verbosity = 1, "ICMP probe for {addr} unavailable: {e:#}");
                }
            }
        }
        tcp_probe(addr).await
    }
}

async fn icmp_probe(target: IpAddr) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || blocking_icmp_probe(target))
        .await
        .context("probe task failed")?
}

/// Sends one echo request and waits out the deadline for a matching
/// reply. Runs on a blocking thread; pnet's receiver has no async mode.
fn blocking_icmp_probe(target: IpAddr) -> anyhow::Result<bool> {
    let (mut tx, mut rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
        .context("failed to open ICMP transport channel")?;

    let identifier: u16 = rand::random();
    let request: Vec<u8> = icmp::create_echo_request(identifier, 0)?;
    let packet: IcmpPacket =
        IcmpPacket::new(&request).context("failed to frame echo request")?;
    tx.send_to(packet, target).context("failed to send echo request")?;

    let deadline: Instant = Instant::now() + PROBE_TIMEOUT;
    let mut replies = transport::icmp_packet_iter(&mut rx);

    loop {
        let remaining: Duration = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }

        match replies.next_with_timeout(remaining).context("echo receive failed")? {
            Some((reply, source)) if source == target => {
                // The channel sees every ICMP packet on the host, so the
                // identifier check matters: another process's ping from
                // the same box must not count as our reply.
                if let Some((ident, _)) = icmp::parse_echo_reply(&reply)
                    && ident == identifier
                {
                    return Ok(true);
                }
            }
            Some(_) => continue,
            None => return Ok(false),
        }
    }
}

async fn tcp_probe(addr: IpAddr) -> bool {
    let socket_addr: SocketAddr = SocketAddr::new(addr, FALLBACK_PROBE_PORT);

    match timeout(PROBE_TIMEOUT, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_)) | Ok(Err(_)) => true,
        Err(_elapsed) => false,
    }
}
