// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! Status endpoint client for the firewall nodes.
//!
//! One GET per node and cycle against the diagnostics API, with the
//! key/secret pair as basic credentials. The response is parsed as JSON
//! and handed to the schema-free CARP scan; no field names are assumed
//! here.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use vane_common::config::ApiCredentials;
use vane_common::models::node::Node;
use vane_protocols::carp;

use crate::detector::{NodeRole, StatusSource};

/// The pair answers this fast on a LAN or not at all.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

pub const STATUS_ENDPOINT: &str = "/api/diagnostics/interface/getInterfaceConfig";

pub struct ApiStatusSource {
    http: reqwest::Client,
    key: String,
    secret: String,
}

impl ApiStatusSource {
    pub fn new(credentials: &ApiCredentials) -> anyhow::Result<Self> {
        let http: reqwest::Client = reqwest::Client::builder()
            .timeout(STATUS_TIMEOUT)
            .build()
            .context("failed to build the status HTTP client")?;

        Ok(Self {
            http,
            key: credentials.key.clone(),
            secret: credentials.secret.clone(),
        })
    }
}

#[async_trait]
impl StatusSource for ApiStatusSource {
    async fn role(&self, node: &Node) -> anyhow::Result<NodeRole> {
        let url: String = format!("http://{}{STATUS_ENDPOINT}", node.control_addr);

        let document: Value = self
            .http
            .get(&url)
            .basic_auth(&self.key, Some(&self.secret))
            .send()
            .await
            .with_context(|| format!("status query to {} failed", node.label))?
            .error_for_status()
            .with_context(|| format!("status query to {} refused", node.label))?
            .json()
            .await
            .with_context(|| format!("status document from {} is not JSON", node.label))?;

        if carp::claims_master(&document) {
            Ok(NodeRole::Master)
        } else {
            Ok(NodeRole::Backup)
        }
    }
}
