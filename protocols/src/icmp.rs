// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, IcmpCodes, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpPacket, IcmpTypes, checksum};

const ECHO_HDR_LEN: usize = 8;
const ECHO_PAYLOAD: [u8; 8] = *b"vane-rap";

pub const ECHO_REQ_LEN: usize = ECHO_HDR_LEN + ECHO_PAYLOAD.len();

/// Builds one ICMPv4 echo request, ready to hand to a Layer 4 transport
/// channel. `identifier` ties replies back to the probe that sent them.
pub fn create_echo_request(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer: [u8; ECHO_REQ_LEN] = [0u8; ECHO_REQ_LEN];

    {
        let mut echo: MutableEchoRequestPacket = MutableEchoRequestPacket::new(&mut buffer[..])
            .context("failed to create echo request packet")?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCodes::NoCode);
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(&ECHO_PAYLOAD);
        let echo_imm: EchoRequestPacket = echo.to_immutable();
        let icmp_pkt: IcmpPacket =
            IcmpPacket::new(echo_imm.packet()).context("failed to create ICMP packet")?;
        let csm = checksum(&icmp_pkt);
        echo.set_checksum(csm);
    }

    Ok(buffer.to_vec())
}

/// Reads `(identifier, sequence)` out of an echo reply. Any other ICMP
/// type yields `None`.
pub fn parse_echo_reply(packet: &IcmpPacket) -> Option<(u16, u16)> {
    if packet.get_icmp_type() != IcmpTypes::EchoReply {
        return None;
    }
    let reply: EchoReplyPacket = EchoReplyPacket::new(packet.packet())?;
    Some((reply.get_identifier(), reply.get_sequence_number()))
}
