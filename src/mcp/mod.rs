//! MCP (Model Context Protocol) Server Implementation
//!
//! JSON-RPC 2.0 over newline-delimited stdio, exposing the CRM tools and
//! resources registered at startup.


pub mod errors;
pub mod protocol;
pub mod resources;
pub mod schema;
pub mod server;
pub mod tools;
pub mod validation;

use crate::crm::CrmBackend;
use std::sync::Arc;
use url::Url;

pub use errors::{ErrorHandler, McpError, McpResult};
pub use protocol::{
    CallToolParams, CallToolResult, ListResourcesResult, ListToolsResult, ReadResourceResult,
    Resource, ResourceContents, Tool, ToolContent,
};
pub use resources::{CustomersResource, OpenTicketsResource};
pub use schema::{InputSchema, ParamKind, ParamSchema, SchemaError, ToolDefinition};
pub use server::{ConnectionState, McpServer, MessageHandler, ResourceHandler, ToolHandler};
pub use tools::{CreateSupportTicketHandler, QueryCustomerHandler};

/// Register the CRM tools and resources on `server`, all backed by `crm`.
/// Resource URIs are built under `base`.
#[inline]
pub async fn register_crm_handlers(
    server: &McpServer,
    crm: &Arc<dyn CrmBackend>,
    base: &Url,
) -> McpResult<()> {
    server
        .register_tool(
            QueryCustomerHandler::tool_definition(),
            QueryCustomerHandler::new(Arc::clone(crm)),
        )
        .await?;
    server
        .register_tool(
            CreateSupportTicketHandler::tool_definition(),
            CreateSupportTicketHandler::new(Arc::clone(crm)),
        )
        .await?;
    server
        .register_resource(
            CustomersResource::resource_definition(base),
            CustomersResource::new(Arc::clone(crm)),
        )
        .await?;
    server
        .register_resource(
            OpenTicketsResource::resource_definition(base),
            OpenTicketsResource::new(Arc::clone(crm)),
        )
        .await?;

    Ok(())
}
