use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrmMcpError>;

#[derive(Error, Debug)]
pub enum CrmMcpError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("MCP error: {0}")]
    Mcp(#[from] mcp::McpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod crm;
pub mod mcp;
