// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Vane CLI Entry Point
//!
//! The binary entry point for vane.
//!
//! This module bootstraps the runtime and owns the process lifecycle,
//! keeping the command-line layer away from the core library logic.
//!
//! ## Responsibilities
//!
//! 1.  **Runtime Initialization**: `#[tokio::main]` brings up the async
//!     runtime all remote calls run on.
//! 2.  **Global State Setup**: wires the `tracing` subscriber before
//!     anything can log.
//! 3.  **Configuration**: loads and validates the TOML configuration
//!     once; everything downstream receives it by reference.
//! 4.  **Command Dispatch**: routes execution to `commands/`.
//! 5.  **Error Boundary**: any error that escapes a command is logged
//!     here and converted into a non-zero `ExitCode`.

mod commands;
mod logging;

use std::process::ExitCode;

use vane_common::{config::Config, error};

use crate::commands::{CommandLine, Commands, run, status, sync};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();
    logging::init_logging(commands.verbosity);

    let config: Config = match Config::load(&commands.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration rejected: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match &commands.command {
        Commands::Run => run::run(&config).await,
        Commands::Status => status::status(&config).await,
        Commands::Sync => sync::sync(&config).await,
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Critical failure: {e:#}");
            ExitCode::FAILURE
        }
    }
}
