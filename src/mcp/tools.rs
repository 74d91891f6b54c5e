//! MCP Tools Implementation
//!
//! The CRM tools: customer lookup and support ticket creation. Both report
//! their own failures in-band as `isError` results.

use crate::crm::{CrmBackend, NewTicket, Priority};
use crate::mcp::protocol::*;
use crate::mcp::schema::{InputSchema, ParamKind, ParamSchema, ToolDefinition};
use crate::mcp::server::ToolHandler;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const QUERY_CUSTOMER: &str = "query_customer";
pub const CREATE_SUPPORT_TICKET: &str = "create_support_ticket";

#[derive(Debug, Deserialize)]
struct QueryCustomerArgs {
    customer_id: String,
    fields: Option<Vec<String>>,
}

/// Customer lookup tool handler
pub struct QueryCustomerHandler {
    crm: Arc<dyn CrmBackend>,
}

/// Support ticket creation tool handler
pub struct CreateSupportTicketHandler {
    crm: Arc<dyn CrmBackend>,
}

fn decode_arguments<T: for<'de> Deserialize<'de>>(params: CallToolParams) -> Result<T> {
    let arguments = Value::Object(params.arguments.unwrap_or_default());
    serde_json::from_value(arguments)
        .with_context(|| format!("Invalid arguments for {}", params.name))
}

/// Keep only the requested top-level fields of a record. `id` is always kept.
fn project_fields(record: Value, fields: &[String]) -> Value {
    match record {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| key == "id" || fields.iter().any(|f| f == key))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

impl QueryCustomerHandler {
    /// Create a new query customer handler
    #[inline]
    pub fn new(crm: Arc<dyn CrmBackend>) -> Self {
        Self { crm }
    }

    /// Create the query_customer tool definition
    #[inline]
    pub fn tool_definition() -> ToolDefinition {
        ToolDefinition::new(
            QUERY_CUSTOMER,
            "Query customer information from enterprise CRM",
            InputSchema::new(vec![
                ParamSchema::required("customer_id", "Customer ID to query", ParamKind::String),
                ParamSchema::optional(
                    "fields",
                    "Fields to return (optional)",
                    ParamKind::array_of(ParamKind::String),
                ),
            ]),
        )
    }

    async fn query(&self, params: CallToolParams) -> Result<String> {
        let args: QueryCustomerArgs = decode_arguments(params)?;

        debug!(
            "Querying customer: id='{}', fields={:?}",
            args.customer_id, args.fields
        );

        let customer = self
            .crm
            .fetch_customer(&args.customer_id, args.fields.as_deref())
            .await?;

        let mut record = serde_json::to_value(&customer)?;
        if let Some(fields) = &args.fields {
            record = project_fields(record, fields);
        }

        Ok(serde_json::to_string_pretty(&record)?)
    }
}

#[async_trait]
impl ToolHandler for QueryCustomerHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        match self.query(params).await {
            Ok(text) => Ok(CallToolResult::text(text)),
            Err(e) => {
                error!("Error querying customer: {:#}", e);
                Ok(CallToolResult::error(format!(
                    "Error querying customer: {:#}",
                    e
                )))
            }
        }
    }
}

impl CreateSupportTicketHandler {
    /// Create a new support ticket handler
    #[inline]
    pub fn new(crm: Arc<dyn CrmBackend>) -> Self {
        Self { crm }
    }

    /// Create the create_support_ticket tool definition
    #[inline]
    pub fn tool_definition() -> ToolDefinition {
        ToolDefinition::new(
            CREATE_SUPPORT_TICKET,
            "Create a support ticket in the enterprise system",
            InputSchema::new(vec![
                ParamSchema::required("customer_id", "Customer ID", ParamKind::String),
                ParamSchema::required("title", "Ticket title", ParamKind::String),
                ParamSchema::required("description", "Ticket description", ParamKind::String),
                ParamSchema::optional(
                    "priority",
                    "Ticket priority (low, medium, high, critical)",
                    ParamKind::one_of(Priority::ALL.map(Priority::as_str)),
                )
                .with_default(Value::String(Priority::default().to_string())),
            ]),
        )
    }

    async fn create(&self, params: CallToolParams) -> Result<String> {
        let new_ticket: NewTicket = decode_arguments(params)?;

        let ticket = self.crm.create_ticket(new_ticket).await?;
        info!(
            "Created ticket {} for customer {} ({})",
            ticket.id, ticket.customer_id, ticket.priority
        );

        Ok(format!(
            "Support ticket created successfully.\nTicket ID: {}\nStatus: {}\nPriority: {}",
            ticket.id, ticket.status, ticket.priority
        ))
    }
}

#[async_trait]
impl ToolHandler for CreateSupportTicketHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        match self.create(params).await {
            Ok(text) => Ok(CallToolResult::text(text)),
            Err(e) => {
                error!("Error creating ticket: {:#}", e);
                Ok(CallToolResult::error(format!("Error creating ticket: {:#}", e)))
            }
        }
    }
}
