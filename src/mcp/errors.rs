//! MCP Error Handling
//!
//! Classifies failures raised while serving a request and maps them onto
//! JSON-RPC error objects.

use crate::mcp::protocol::*;
use crate::mcp::schema::SchemaError;
use thiserror::Error;
use tracing::error;

/// MCP-specific errors that can occur during server operation
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Protocol version not supported: {version}. Supported versions: {supported:?}")]
    UnsupportedProtocolVersion {
        version: String,
        supported: Vec<String>,
    },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },

    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error("Resource already registered: {name}")]
    DuplicateResource { name: String },

    #[error("Invalid tool parameters for {tool}: {source}")]
    InvalidToolParameters {
        tool: String,
        #[source]
        source: SchemaError,
    },

    /// A resource handler could not produce its contents. Propagated to the
    /// caller as an error response; the server keeps running.
    #[error("Failed to fetch {what}: {message}")]
    ResourceFetch { what: String, message: String },

    #[error("Failed to start transport: {message}")]
    TransportStartup { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },

    #[error("JSON-RPC parse error: {message}")]
    ParseError { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::UnsupportedProtocolVersion { version, supported } => JsonRpcError::new(
                mcp_error_codes::INVALID_PROTOCOL_VERSION,
                format!(
                    "Unsupported protocol version: {}. Supported: {}",
                    version,
                    supported.join(", ")
                ),
                None,
            ),
            Self::ToolNotFound { name } => JsonRpcError::new(
                mcp_error_codes::TOOL_NOT_FOUND,
                format!("Tool not found: {}", name),
                None,
            ),
            Self::ResourceNotFound { uri } => JsonRpcError::new(
                mcp_error_codes::RESOURCE_NOT_FOUND,
                format!("Resource not found: {}", uri),
                None,
            ),
            Self::InvalidToolParameters { tool, source } => JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Invalid parameters for tool '{}': {}", tool, source),
                None,
            ),
            Self::InvalidRequest { message } => {
                JsonRpcError::invalid_request(Some(message.clone()))
            }
            Self::InvalidParameters { message } => {
                JsonRpcError::invalid_params(Some(message.clone()))
            }
            Self::ParseError { message } => JsonRpcError::new(
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", message),
                None,
            ),
            Self::MethodNotFound { method } => JsonRpcError::method_not_found(method),
            Self::ResourceFetch { .. }
            | Self::DuplicateTool { .. }
            | Self::DuplicateResource { .. }
            | Self::TransportStartup { .. }
            | Self::InternalError { .. } => JsonRpcError::internal_error(Some(self.to_string())),
        }
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        let error = self.to_jsonrpc_error();
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, id))
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::ParseError { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidParameters { .. }
            | Self::InvalidToolParameters { .. } => {
                error!("Client error: {}", self);
            }
            Self::ToolNotFound { .. } | Self::ResourceNotFound { .. } => {
                error!("Not found error: {}", self);
            }
            Self::ResourceFetch { .. } | Self::InternalError { .. } => {
                error!("Server error: {}", self);
            }
            _ => {
                error!("MCP error: {}", self);
            }
        }
    }
}

/// Error handler utility for consistent error processing
pub struct ErrorHandler;

impl ErrorHandler {
    /// Handle any error and convert to appropriate JSON-RPC response
    #[inline]
    pub fn handle_error(error: &anyhow::Error, id: Option<RequestId>) -> JsonRpcMessage {
        if let Some(mcp_error) = error.downcast_ref::<McpError>() {
            mcp_error.log();
            return mcp_error.to_error_response(id);
        }

        if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
            let invalid = McpError::InvalidParameters {
                message: json_error.to_string(),
            };
            invalid.log();
            return invalid.to_error_response(id);
        }

        error!("Unexpected error: {:#}", error);
        let internal_error = McpError::InternalError {
            message: format!("{:#}", error),
        };
        internal_error.to_error_response(id)
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
