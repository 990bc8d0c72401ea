// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use anyhow::Context;

use vane_common::config::Config;
use vane_common::models::mapping::RemoteMapping;
use vane_common::{info, success, warn};
use vane_core::detector::Detector;
use vane_core::nat::{NatClient, Tr064Client};

use crate::commands::build_detector;

/// One-shot view: who is master, and what does the router's table
/// actually contain right now.
pub async fn status(config: &Config) -> anyhow::Result<()> {
    match build_detector(config)?.detect().await {
        Some(signal) => success!("current master: {} [{} signal]", signal.node(), signal.quality()),
        None => warn!("no master is currently detectable"),
    }

    let client = Tr064Client::new(&config.router)?;
    let mappings: Vec<RemoteMapping> = client
        .list_mappings()
        .await
        .context("could not read the router's mapping table")?;

    if mappings.is_empty() {
        info!("router reports an empty mapping table");
        return Ok(());
    }

    for mapping in &mappings {
        info!("[{}] {}", mapping.index, mapping);
    }
    Ok(())
}
