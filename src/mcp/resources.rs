//! MCP Resources Implementation
//!
//! Read-only CRM listings. Unlike the tools, fetch failures are not turned
//! into content: they surface as [`McpError::ResourceFetch`] and fail the
//! read request.

use crate::crm::CrmBackend;
use crate::mcp::errors::McpError;
use crate::mcp::protocol::{Resource, ResourceContents};
use crate::mcp::server::ResourceHandler;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const JSON_MIME_TYPE: &str = "application/json";

/// Active customer listing
pub struct CustomersResource {
    crm: Arc<dyn CrmBackend>,
}

/// Open support ticket listing
pub struct OpenTicketsResource {
    crm: Arc<dyn CrmBackend>,
}

/// Wrap a backend failure, keeping its whole source chain in the message
#[inline]
pub fn fetch_failed<E>(what: &str, error: E) -> McpError
where
    E: std::error::Error + Send + Sync + 'static,
{
    McpError::ResourceFetch {
        what: what.to_string(),
        message: format!("{:#}", anyhow::Error::new(error)),
    }
}

fn json_contents<T: serde::Serialize>(uri: &str, what: &str, records: &T) -> Result<ResourceContents> {
    let text = serde_json::to_string_pretty(records).map_err(|e| McpError::ResourceFetch {
        what: what.to_string(),
        message: e.to_string(),
    })?;

    Ok(ResourceContents {
        uri: uri.to_string(),
        mime_type: JSON_MIME_TYPE.to_string(),
        text,
    })
}

impl CustomersResource {
    #[inline]
    pub fn new(crm: Arc<dyn CrmBackend>) -> Self {
        Self { crm }
    }

    /// Resource descriptor under `base` (normally `crm://`)
    #[inline]
    pub fn resource_definition(base: &Url) -> Resource {
        Resource {
            uri: format!("{}customers", base),
            name: "customers".to_string(),
            description: Some("List of all active customers".to_string()),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
        }
    }
}

#[async_trait]
impl ResourceHandler for CustomersResource {
    #[inline]
    async fn handle(&self, uri: &str) -> Result<ResourceContents> {
        let customers = self
            .crm
            .fetch_all_customers()
            .await
            .map_err(|e| fetch_failed("customers", e))?;

        debug!("Fetched {} customers", customers.len());
        json_contents(uri, "customers", &customers)
    }
}

impl OpenTicketsResource {
    #[inline]
    pub fn new(crm: Arc<dyn CrmBackend>) -> Self {
        Self { crm }
    }

    #[inline]
    pub fn resource_definition(base: &Url) -> Resource {
        Resource {
            uri: format!("{}open-tickets", base),
            name: "open-tickets".to_string(),
            description: Some("List of all open support tickets".to_string()),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
        }
    }
}

#[async_trait]
impl ResourceHandler for OpenTicketsResource {
    #[inline]
    async fn handle(&self, uri: &str) -> Result<ResourceContents> {
        let tickets = self
            .crm
            .fetch_open_tickets()
            .await
            .map_err(|e| fetch_failed("tickets", e))?;

        debug!("Fetched {} open tickets", tickets.len());
        json_contents(uri, "tickets", &tickets)
    }
}
