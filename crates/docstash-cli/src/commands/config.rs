//! Config command handlers

use std::path::PathBuf;

use anyhow::Result;

use docstash_core::StoreConfig;

use crate::output::Output;

/// Show the effective configuration
pub fn show(config: &StoreConfig, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let source = config_path
        .cloned()
        .unwrap_or_else(StoreConfig::config_file_path);

    output.print_config(config, &source.display().to_string());
    Ok(())
}
