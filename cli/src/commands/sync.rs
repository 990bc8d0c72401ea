// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use vane_common::config::Config;

use crate::commands::{Controller, build_controller};

/// Forces one full reconciliation toward whichever node is detectable
/// as master right now, whether or not anything changed. Useful after
/// editing the rule set, and as a manual recovery hammer.
pub async fn sync(config: &Config) -> anyhow::Result<()> {
    let mut controller: Controller = build_controller(config)?;
    controller.sync_once().await
}
