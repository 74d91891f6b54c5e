//! MCP Server Implementation
//!
//! The registration shim: a dispatch table binding tool and resource names to
//! their handlers, plus the line-delimited JSON-RPC loop that feeds it from a
//! transport.

use crate::mcp::errors::{ErrorHandler, McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::schema::ToolDefinition;
use crate::mcp::validation::McpValidator;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// MCP Server state and configuration
pub struct McpServer {
    /// Server implementation information
    pub server_info: Implementation,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Text returned to clients on initialize
    pub instructions: Option<String>,
    /// Registered tools keyed by name
    pub tools: Arc<RwLock<HashMap<String, RegisteredTool>>>,
    /// Registered resources keyed by name
    pub resources: Arc<RwLock<HashMap<String, RegisteredResource>>>,
    /// Connection state
    pub connection_state: Arc<RwLock<ConnectionState>>,
    /// Message validator
    pub validator: Arc<McpValidator>,
    started_at: Instant,
}

/// Connection state tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Tool handler trait for implementing tool execution.
///
/// Arguments have already been validated against the tool's input schema
/// and carry its defaults. Failures of the tool's own work should come back
/// as a result with `is_error` set; an `Err` is reported to the caller as a
/// protocol error instead.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

/// Resource handler trait for implementing resource access.
///
/// Errors are not caught by the server; they fail the read request.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(&self, uri: &str) -> Result<ResourceContents>;
}

pub struct RegisteredTool {
    pub definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

pub struct RegisteredResource {
    pub resource: Resource,
    handler: Arc<dyn ResourceHandler>,
}

/// Message handler for processing incoming messages
pub struct MessageHandler {
    server: Arc<McpServer>,
}

impl McpServer {
    /// Create a new MCP server
    #[inline]
    pub fn new(name: String, version: String) -> Self {
        let server_info = Implementation { name, version };

        let capabilities = ServerCapabilities {
            experimental: None,
            resources: Some(ResourcesCapability {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        Self {
            server_info,
            capabilities,
            instructions: None,
            tools: Arc::new(RwLock::new(HashMap::new())),
            resources: Arc::new(RwLock::new(HashMap::new())),
            connection_state: Arc::new(RwLock::new(ConnectionState::Uninitialized)),
            validator: Arc::new(McpValidator::new()),
            started_at: Instant::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Register a tool with the server. Names must be unique.
    #[inline]
    pub async fn register_tool<H>(&self, definition: ToolDefinition, handler: H) -> McpResult<()>
    where
        H: ToolHandler + 'static,
    {
        let tool_name = definition.name.clone();

        {
            let mut tools = self.tools.write().await;
            if tools.contains_key(&tool_name) {
                return Err(McpError::DuplicateTool { name: tool_name });
            }
            tools.insert(
                tool_name.clone(),
                RegisteredTool {
                    definition,
                    handler: Arc::new(handler),
                },
            );
        }

        debug!("Registered tool: {}", tool_name);
        Ok(())
    }

    /// Register a resource with the server. Names and URIs must be unique.
    #[inline]
    pub async fn register_resource<H>(&self, resource: Resource, handler: H) -> McpResult<()>
    where
        H: ResourceHandler + 'static,
    {
        let resource_name = resource.name.clone();

        {
            let mut resources = self.resources.write().await;
            if resources
                .values()
                .any(|r| r.resource.name == resource.name || r.resource.uri == resource.uri)
            {
                return Err(McpError::DuplicateResource {
                    name: resource_name,
                });
            }
            debug!("Registered resource: {} ({})", resource_name, resource.uri);
            resources.insert(
                resource_name,
                RegisteredResource {
                    resource,
                    handler: Arc::new(handler),
                },
            );
        }

        Ok(())
    }

    /// Registered tool descriptors, sorted by name
    #[inline]
    pub async fn list_tools(&self) -> Vec<Tool> {
        let tools = self.tools.read().await;
        let mut listed: Vec<Tool> = tools.values().map(|t| t.definition.to_tool()).collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    /// Registered resource descriptors, sorted by name
    #[inline]
    pub async fn list_resources(&self) -> Vec<Resource> {
        let resources = self.resources.read().await;
        let mut listed: Vec<Resource> = resources.values().map(|r| r.resource.clone()).collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    /// Validate the arguments of a tool call and run its handler
    #[inline]
    pub async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult> {
        let (handler, arguments) = {
            let tools = self.tools.read().await;
            let tool = tools.get(&params.name).ok_or_else(|| McpError::ToolNotFound {
                name: params.name.clone(),
            })?;

            let arguments = tool
                .definition
                .input_schema
                .validate(params.arguments)
                .map_err(|source| McpError::InvalidToolParameters {
                    tool: params.name.clone(),
                    source,
                })?;

            (Arc::clone(&tool.handler), arguments)
        };

        debug!("Calling tool: {}", params.name);
        handler
            .handle(CallToolParams {
                name: params.name,
                arguments: Some(arguments),
            })
            .await
    }

    /// Read a resource addressed by URI or by name
    #[inline]
    pub async fn read_resource(&self, uri_or_name: &str) -> Result<ResourceContents> {
        let (handler, uri) = {
            let resources = self.resources.read().await;
            let registered = resources
                .get(uri_or_name)
                .or_else(|| resources.values().find(|r| r.resource.uri == uri_or_name))
                .ok_or_else(|| McpError::ResourceNotFound {
                    uri: uri_or_name.to_string(),
                })?;

            (
                Arc::clone(&registered.handler),
                registered.resource.uri.clone(),
            )
        };

        debug!("Reading resource: {}", uri);
        handler.handle(&uri).await
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve_transport(BufReader::new(io::stdin()), io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC messages from `reader`, writing
    /// responses to `writer`, until the reader reaches EOF.
    #[inline]
    pub async fn serve_transport<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = Vec::new();
        let mut established = false;
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    established = true;
                    let line = match std::str::from_utf8(&buffer) {
                        Ok(text) => text.trim(),
                        Err(e) => {
                            self.reject_unparseable(&mut writer, e.to_string()).await?;
                            continue;
                        }
                    };
                    if line.is_empty() {
                        continue;
                    }

                    let raw_value: Value = match serde_json::from_str(line) {
                        Ok(value) => value,
                        Err(e) => {
                            self.reject_unparseable(&mut writer, e.to_string()).await?;
                            continue;
                        }
                    };

                    match self.validator.validate_raw_message(&raw_value) {
                        Ok(message) => {
                            let handler = MessageHandler::new(Arc::clone(&self));
                            handler.process_message(message, &mut writer).await?;
                        }
                        Err(e) => {
                            e.log();
                            let id = raw_value
                                .get("id")
                                .and_then(|id| serde_json::from_value(id.clone()).ok());
                            self.send_message(&mut writer, &e.to_error_response(id))
                                .await?;
                        }
                    }
                }
                Err(e) if !established => {
                    return Err(McpError::TransportStartup {
                        message: e.to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    error!("Error reading from transport: {}", e);
                    break;
                }
            }
        }

        {
            let mut state = self.connection_state.write().await;
            *state = ConnectionState::Closed;
        }

        info!("MCP server stopped");
        Ok(())
    }

    /// Answer a line that is not a JSON document. There is no id to echo.
    async fn reject_unparseable<W>(&self, writer: &mut W, message: String) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let parse_error = McpError::ParseError { message };
        parse_error.log();
        self.send_message(writer, &parse_error.to_error_response(None))
            .await
    }

    /// Send a message to the client
    async fn send_message<W>(&self, writer: &mut W, message: &JsonRpcMessage) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let json = serde_json::to_string(message)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Get current connection state
    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        self.connection_state.read().await.clone()
    }

    #[inline]
    pub async fn health_status(&self) -> ServerHealthStatus {
        ServerHealthStatus {
            connection_state: self.connection_state().await,
            tools_registered: self.tools.read().await.len(),
            resources_registered: self.resources.read().await.len(),
            uptime: self.started_at.elapsed(),
        }
    }

    #[inline]
    pub async fn server_statistics(&self) -> ServerStatistics {
        ServerStatistics {
            server_info: self.server_info.clone(),
            capabilities: self.capabilities.clone(),
            connection_state: self.connection_state().await,
            registered_tools: self.list_tools().await.into_iter().map(|t| t.name).collect(),
            registered_resources: self
                .list_resources()
                .await
                .into_iter()
                .map(|r| r.name)
                .collect(),
        }
    }
}

impl MessageHandler {
    /// Create a new message handler
    #[inline]
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Process an incoming message
    #[inline]
    pub async fn process_message<W>(&self, message: JsonRpcMessage, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match message {
            JsonRpcMessage::Request(request) => self.handle_request(request, writer).await,
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                Ok(())
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                Ok(())
            }
        }
    }

    /// Handle a JSON-RPC request
    async fn handle_request<W>(&self, request: JsonRpcRequest, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "resources/list" => self.handle_list_resources().await,
            "resources/read" => self.handle_read_resource(request.params).await,
            "ping" => Ok(Self::handle_ping()),
            _ => Err(McpError::MethodNotFound {
                method: request.method.clone(),
            }
            .into()),
        };

        let message = match response {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => {
                error!("Error handling request {}: {:#}", request.method, e);
                ErrorHandler::handle_error(&e, Some(request.id))
            }
        };

        self.server.send_message(writer, &message).await
    }

    /// Handle a JSON-RPC notification
    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => self.handle_initialized().await,
            "notifications/cancelled" => {
                debug!("Received cancellation notification");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams =
            McpValidator::decode_params("initialize", params.as_ref())?;

        if !self
            .server
            .validator
            .is_protocol_version_supported(&params.protocol_version)
        {
            return Err(McpError::UnsupportedProtocolVersion {
                version: params.protocol_version,
                supported: self
                    .server
                    .validator
                    .supported_protocol_versions()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            }
            .into());
        }

        {
            let mut state = self.server.connection_state.write().await;
            *state = ConnectionState::Initializing;
        }

        let result = InitializeResult {
            protocol_version: params.protocol_version,
            capabilities: self.server.capabilities.clone(),
            server_info: self.server.server_info.clone(),
            instructions: self.server.instructions.clone(),
        };

        info!("Client initialized: {}", params.client_info.name);
        Ok(serde_json::to_value(result)?)
    }

    /// Handle initialized notification
    async fn handle_initialized(&self) {
        {
            let mut state = self.server.connection_state.write().await;
            *state = ConnectionState::Ready;
        }

        info!("Server ready to handle requests");
    }

    /// Handle list tools request
    #[inline]
    pub async fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.server.list_tools().await,
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = McpValidator::decode_params("tools/call", params.as_ref())?;
        let result = self.server.call_tool(params).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list resources request
    #[inline]
    pub async fn handle_list_resources(&self) -> Result<Value> {
        let result = ListResourcesResult {
            resources: self.server.list_resources().await,
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle read resource request
    #[inline]
    pub async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        let params: ReadResourceParams =
            McpValidator::decode_params("resources/read", params.as_ref())?;
        let contents = self.server.read_resource(&params.uri).await?;
        let result = ReadResourceResult {
            contents: vec![contents],
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_ping() -> Value {
        serde_json::json!({})
    }
}
