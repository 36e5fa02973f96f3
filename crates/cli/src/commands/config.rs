// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::ConfigCommand;
use crate::config::{config_path, Config};
use crate::error::Result;

use super::Context;

/// Execute a config subcommand.
pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => print!("{}", render(&ctx.load_config()?)?),
        ConfigCommand::Path => println!("{}", config_path(ctx.state_dir()).display()),
    }
    Ok(())
}

/// Renders the effective configuration as TOML.
pub fn render(config: &Config) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
