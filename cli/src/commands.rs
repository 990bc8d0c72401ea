// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Command Line Interface Definitions
//!
//! The strict schema for user input, and the single place the concrete
//! controller stack is assembled. Execution logic for each command
//! lives in its own submodule; the argument and flag definitions are
//! centralized here.

pub mod run;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use vane_common::config::Config;
use vane_core::controller::FailoverController;
use vane_core::detector::MasterDetector;
use vane_core::nat::Tr064Client;
use vane_core::network::probe::LivenessProbe;
use vane_core::reconciler::Reconciler;
use vane_core::status::ApiStatusSource;

#[derive(Parser)]
#[command(name = "vane")]
#[command(about = "Keeps a router's port forwarding pointed at the active firewall node.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the TOML configuration file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        default_value = "/etc/vane/vane.toml"
    )]
    pub config: PathBuf,

    /// Increase logging detail (-v: per-operation logs)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the pair and move forwarding when the master changes
    #[command(alias = "r")]
    Run,

    /// Detect the current master and print the live mapping table
    Status,

    /// Reconcile toward the detected master once, then exit
    Sync,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

type Detector = MasterDetector<ApiStatusSource, LivenessProbe>;
pub(crate) type Controller = FailoverController<Detector, Tr064Client>;

pub(crate) fn build_detector(config: &Config) -> anyhow::Result<Detector> {
    Ok(MasterDetector::new(
        config.nodes.clone(),
        ApiStatusSource::new(&config.status_api)?,
        LivenessProbe::new(),
    ))
}

pub(crate) fn build_controller(config: &Config) -> anyhow::Result<Controller> {
    Ok(FailoverController::new(
        build_detector(config)?,
        Tr064Client::new(&config.router)?,
        Reconciler::new(config.rules.clone()),
        config.poll_interval(),
    ))
}
