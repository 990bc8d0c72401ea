// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # TR-064 WANIPConnection Codec
//!
//! Builds SOAP request envelopes for the router's `WANIPConnection`
//! service and parses its responses. Three actions matter to vane:
//!
//! * `GetGenericPortMappingEntry` — read one table entry by index
//! * `DeletePortMapping` — remove an entry by (port, protocol)
//! * `AddPortMapping` — create an entry
//!
//! The functions here are pure; the HTTP transport (and its digest
//! handshake) lives in `vane-core`. Response elements are located by
//! local name only, so namespace prefixes the device chooses do not
//! matter.

use std::collections::HashMap;

use thiserror::Error;
use xmltree::{Element, XMLNode};

use vane_common::models::mapping::RemoteMapping;
use vane_common::models::rule::Protocol;

pub const SERVICE_TYPE: &str = "urn:dslforum-org:service:WANIPConnection:1";
pub const CONTROL_PATH: &str = "/upnp/control/wanipconnection1";
pub const CONTROL_PORT: u16 = 49000;

#[derive(Debug, Error)]
#[error("malformed TR-064 response: {0}")]
pub struct MalformedResponse(pub String);

/// Value of the `SOAPACTION` header for an action on the WAN service.
pub fn soap_action(action: &str) -> String {
    format!("{SERVICE_TYPE}#{action}")
}

/// Renders a complete request envelope for `action` with its arguments,
/// in document order. Argument values are XML-escaped.
pub fn envelope(action: &str, arguments: &[(&str, String)]) -> String {
    let mut body: String = String::new();
    for (name, value) in arguments {
        body.push_str("      <");
        body.push_str(name);
        body.push('>');
        body.push_str(&escape(value));
        body.push_str("</");
        body.push_str(name);
        body.push_str(">\n");
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
 s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:{action} xmlns:u="{SERVICE_TYPE}">
{body}    </u:{action}>
  </s:Body>
</s:Envelope>
"#
    )
}

fn escape(value: &str) -> String {
    let mut escaped: String = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// A structured UPnP error carried in a SOAP fault body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: String,
    pub description: String,
}

/// Extracts the `UPnPError` element from a fault body, if one is
/// present. Returns `None` for bodies that are not parseable XML or
/// carry no structured error.
pub fn parse_fault(body: &str) -> Option<Fault> {
    let root: Element = Element::parse(body.as_bytes()).ok()?;
    let error: &Element = find_descendant(&root, "UPnPError")?;

    let code: String = error.get_child("errorCode")?.get_text()?.trim().to_string();
    let description: String = error
        .get_child("errorDescription")
        .and_then(|d| d.get_text())
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    Some(Fault { code, description })
}

/// Parses a `GetGenericPortMappingEntryResponse` body into the mapping
/// it describes. `index` is the table index the entry was requested at.
pub fn parse_mapping_entry(body: &str, index: u32) -> Result<RemoteMapping, MalformedResponse> {
    let root: Element = Element::parse(body.as_bytes())
        .map_err(|e| MalformedResponse(format!("unparseable XML: {e}")))?;

    let mut fields: HashMap<String, String> = HashMap::new();
    collect_new_fields(&root, &mut fields);

    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| MalformedResponse(format!("missing element {name}")))
    };
    let parse_port = |name: &str| -> Result<u16, MalformedResponse> {
        field(name)?
            .parse::<u16>()
            .map_err(|_| MalformedResponse(format!("{name} is not a port number")))
    };

    Ok(RemoteMapping {
        external_port: parse_port("NewExternalPort")?,
        internal_port: parse_port("NewInternalPort")?,
        protocol: field("NewProtocol")?
            .parse::<Protocol>()
            .map_err(|e| MalformedResponse(e.to_string()))?,
        target_addr: field("NewInternalClient")?
            .parse()
            .map_err(|_| MalformedResponse("NewInternalClient is not an address".to_string()))?,
        description: fields
            .get("NewPortMappingDescription")
            .cloned()
            .unwrap_or_default(),
        index,
    })
}

/// Collects the text of every `New*`-named element, recursively. The
/// device nests them one level under the response element, but depth is
/// not guaranteed across firmware versions.
fn collect_new_fields(element: &Element, fields: &mut HashMap<String, String>) {
    for child in &element.children {
        if let XMLNode::Element(child) = child {
            if child.name.starts_with("New")
                && let Some(text) = child.get_text()
            {
                fields.insert(child.name.clone(), text.trim().to_string());
            }
            collect_new_fields(child, fields);
        }
    }
}

fn find_descendant<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    for child in &element.children {
        if let XMLNode::Element(child) = child {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = find_descendant(child, name) {
                return Some(found);
            }
        }
    }
    None
}
