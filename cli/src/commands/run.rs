// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use vane_common::config::Config;
use vane_common::info;

use crate::commands::{Controller, build_controller};

pub async fn run(config: &Config) -> anyhow::Result<()> {
    info!(
        "watching {} and {} every {}s",
        config.nodes[0].label,
        config.nodes[1].label,
        config.poll_interval_secs
    );

    let controller: Controller = build_controller(config)?;
    controller.run(shutdown_signal()).await
}

/// Resolves on Ctrl-C / SIGINT. The controller finishes or abandons the
/// in-flight cycle and exits between cycles.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
