//! CLI command implementations

pub mod check;
pub mod config;
pub mod retry;

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use settle_core::config::HierarchicalConfigLoader;
use settle_core::types::RuntimeConfig;

/// Load the runtime config from `config_dir`, or from ~/.settle
pub(crate) fn load_config(config_dir: Option<&Utf8Path>) -> Result<RuntimeConfig> {
    let loader = match config_dir {
        Some(dir) => HierarchicalConfigLoader::with_dir(dir.to_path_buf()),
        None => HierarchicalConfigLoader::new()?,
    };
    Ok(loader.load_runtime_config()?)
}

/// Split a command line into program and arguments
pub(crate) fn split_command(command: &[String]) -> Result<(&str, &[String])> {
    command
        .split_first()
        .map(|(program, args)| (program.as_str(), args))
        .ok_or_else(|| anyhow!("No command given"))
}
