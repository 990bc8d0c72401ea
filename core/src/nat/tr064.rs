// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! TR-064 implementation of the NAT capability.
//!
//! One SOAP POST per operation against the router's `WANIPConnection`
//! control endpoint, authenticated with the digest credential pair from
//! the configuration. Envelope construction and response parsing live
//! in `vane_protocols::tr064`; this module only moves them over HTTP.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use diqwest::WithDigestAuth;
use reqwest::header::CONTENT_TYPE;

use vane_common::config::RouterConfig;
use vane_common::models::mapping::{MappingRequest, RemoteMapping};
use vane_common::models::rule::Protocol;
use vane_common::{debug, info, warn};
use vane_protocols::tr064;

use super::{MAX_MAPPING_INDEX, NatClient, NatError};

/// NAT control calls may hit slow flash writes on the device.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Tr064Client {
    http: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl Tr064Client {
    pub fn new(router: &RouterConfig) -> anyhow::Result<Self> {
        let http: reqwest::Client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .context("failed to build the router HTTP client")?;

        let endpoint: String = format!(
            "http://{}:{}{}",
            router.address,
            tr064::CONTROL_PORT,
            tr064::CONTROL_PATH
        );

        Ok(Self {
            http,
            endpoint,
            username: router.username.clone(),
            password: router.password.clone(),
        })
    }

    async fn soap_call(
        &self,
        action: &str,
        arguments: &[(&str, String)],
    ) -> Result<String, NatError> {
        let body: String = tr064::envelope(action, arguments);

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=\"utf-8\"")
            .header("SOAPAction", tr064::soap_action(action))
            .body(body)
            .send_with_digest_auth(&self.username, &self.password)
            .await
            .map_err(|e| NatError::Transport(e.to_string()))?;

        let status = response.status();
        let text: String = response
            .text()
            .await
            .map_err(|e| NatError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(match tr064::parse_fault(&text) {
                Some(fault) => NatError::Device {
                    code: fault.code,
                    description: fault.description,
                },
                None => NatError::Transport(format!("unexpected status {status}")),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl NatClient for Tr064Client {
    async fn list_mappings(&self) -> Result<Vec<RemoteMapping>, NatError> {
        let mut mappings: Vec<RemoteMapping> = Vec::new();

        for index in 0..MAX_MAPPING_INDEX {
            let arguments = [("NewPortMappingIndex", index.to_string())];
            let body = match self.soap_call("GetGenericPortMappingEntry", &arguments).await {
                Ok(body) => body,
                // The device answers the first out-of-range index with a
                // fault. That is the end of the table, not an error.
                Err(NatError::Device { code, description }) => {
                    debug!(
                        verbosity = 1,
                        "mapping scan ended at index {index} (fault {code}: {description})"
                    );
                    return Ok(mappings);
                }
                Err(e) => return Err(e),
            };

            let mapping = tr064::parse_mapping_entry(&body, index)
                .map_err(|e| NatError::Transport(e.to_string()))?;
            debug!(verbosity = 1, "mapping [{index}]: {mapping}");
            mappings.push(mapping);
        }

        warn!("mapping scan hit the {MAX_MAPPING_INDEX}-entry safety cap; table may be truncated");
        Ok(mappings)
    }

    async fn remove_mapping(
        &self,
        external_port: u16,
        protocol: Protocol,
    ) -> Result<bool, NatError> {
        let arguments = [
            ("NewRemoteHost", String::new()),
            ("NewExternalPort", external_port.to_string()),
            ("NewProtocol", protocol.to_string()),
        ];

        match self.soap_call("DeletePortMapping", &arguments).await {
            Ok(_) => Ok(true),
            // Covers "no such entry": the desired end state (entry
            // absent) already holds, so this is not worth an error.
            Err(NatError::Device { code, description }) => {
                info!("device declined removal of {external_port}/{protocol} (fault {code}: {description})");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn add_mapping(&self, request: &MappingRequest) -> Result<bool, NatError> {
        let arguments = [
            ("NewRemoteHost", String::new()),
            ("NewExternalPort", request.external_port.to_string()),
            ("NewProtocol", request.protocol.to_string()),
            ("NewInternalPort", request.internal_port.to_string()),
            ("NewInternalClient", request.target_addr.to_string()),
            ("NewEnabled", "1".to_string()),
            ("NewPortMappingDescription", request.description.clone()),
            ("NewLeaseDuration", "0".to_string()),
        ];

        match self.soap_call("AddPortMapping", &arguments).await {
            Ok(_) => Ok(true),
            Err(NatError::Device { code, description }) => {
                info!(
                    "device declined mapping {}/{} (fault {code}: {description})",
                    request.external_port, request.protocol
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
