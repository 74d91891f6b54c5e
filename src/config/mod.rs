// Configuration management module
// Optional TOML file describing how the server presents itself

pub mod settings;

#[cfg(test)]
mod tests;

use anyhow::Result;
use console::style;
use std::path::Path;

pub use settings::{Config, ConfigError, CrmConfig, ServerConfig};

/// Print the effective configuration and where it was read from
#[inline]
pub fn show_config(config: &Config, config_path: &Path) -> Result<()> {
    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Server Settings:").bold().yellow());
    println!("  Name: {}", style(&config.server.name).cyan());
    println!("  Version: {}", style(&config.server.version).cyan());
    match &config.server.instructions {
        Some(instructions) => println!("  Instructions: {}", style(instructions).cyan()),
        None => println!("  Instructions: {}", style("none").dim()),
    }

    println!();
    println!("{}", style("CRM Settings:").bold().yellow());
    match config.crm.base_url() {
        Ok(url) => println!("  Base URI: {}", style(url).cyan()),
        Err(e) => println!("  Base URI: {} ({})", style("Invalid").red(), e),
    }

    println!();
    if config_path.exists() {
        println!("Config file: {}", style(config_path.display()).dim());
    } else {
        println!(
            "Config file: {} {}",
            style(config_path.display()).dim(),
            style("(not found, using defaults)").dim()
        );
    }

    Ok(())
}
