use crate::config::{self, Config};
use crate::crm::{CrmBackend, PlaceholderCrm};
use crate::mcp::{McpServer, register_crm_handlers};
use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Resolve the config file to use: the explicit one if given, otherwise the
/// default location
#[inline]
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::config_file_path()?),
    }
}

/// Load configuration. An explicit path must exist; the default location
/// falls back to built-in defaults.
#[inline]
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Build the server with every CRM tool and resource registered against
/// `crm`
#[inline]
pub async fn build_server(config: &Config, crm: Arc<dyn CrmBackend>) -> Result<Arc<McpServer>> {
    let server = McpServer::new(config.server.name.clone(), config.server.version.clone())
        .with_instructions(config.server.instructions.clone());

    let base = config.crm.base_url()?;
    register_crm_handlers(&server, &crm, &base)
        .await
        .context("Failed to register CRM handlers")?;

    let health = server.health_status().await;
    info!(
        "Registered {} tools and {} resources",
        health.tools_registered, health.resources_registered
    );

    Ok(Arc::new(server))
}

/// Serve the CRM tools on stdio until the client disconnects
#[inline]
pub async fn serve_mcp(config_file: Option<&Path>) -> Result<()> {
    let config = load_config(config_file).context("Failed to load configuration")?;

    info!(
        "Starting {} {} on stdio",
        config.server.name, config.server.version
    );

    let server = build_server(&config, Arc::new(PlaceholderCrm::new())).await?;
    server.serve_stdio().await?;
    Ok(())
}

#[inline]
pub fn show_config(config_file: Option<&Path>) -> Result<()> {
    let config = load_config(config_file).context("Failed to load configuration")?;
    let path = config_path(config_file)?;
    config::show_config(&config, &path)?;
    Ok(())
}
