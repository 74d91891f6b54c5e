//! MCP Message Validation
//!
//! Structural checks on incoming JSON-RPC messages, run before dispatch so
//! that malformed envelopes and malformed method parameters are rejected with
//! the right JSON-RPC error code.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Validator for MCP messages
#[derive(Debug, Clone)]
pub struct McpValidator {
    supported_versions: Vec<&'static str>,
}

impl McpValidator {
    /// Create a new MCP validator accepting the built-in protocol versions
    #[inline]
    pub fn new() -> Self {
        Self {
            supported_versions: SUPPORTED_PROTOCOL_VERSIONS.to_vec(),
        }
    }

    /// Validate a raw JSON value as a JSON-RPC message
    #[inline]
    pub fn validate_raw_message(&self, value: &Value) -> McpResult<JsonRpcMessage> {
        let object = value.as_object().ok_or_else(|| McpError::InvalidRequest {
            message: "Message must be a JSON object".to_string(),
        })?;

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            _ => {
                return Err(McpError::InvalidRequest {
                    message: format!("jsonrpc must be \"{}\"", JSONRPC_VERSION),
                });
            }
        }

        // A null id must not fall through to the notification variant.
        if let Some(id) = object.get("id") {
            if !(id.is_string() || id.is_i64()) {
                return Err(McpError::InvalidRequest {
                    message: "id must be a string or an integer".to_string(),
                });
            }
        }

        let message: JsonRpcMessage =
            serde_json::from_value(value.clone()).map_err(|e| McpError::InvalidRequest {
                message: e.to_string(),
            })?;

        match &message {
            JsonRpcMessage::Request(request) => self.validate_request(request)?,
            JsonRpcMessage::Notification(notification) => {
                Self::validate_method_name(&notification.method)?;
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {}
        }

        Ok(message)
    }

    /// Validate a JSON-RPC request, including method-specific parameters
    #[inline]
    pub fn validate_request(&self, request: &JsonRpcRequest) -> McpResult<()> {
        Self::validate_method_name(&request.method)?;
        self.validate_method_params(&request.method, request.params.as_ref())
    }

    fn validate_method_name(method: &str) -> McpResult<()> {
        if method.trim().is_empty() {
            return Err(McpError::InvalidRequest {
                message: "method must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Validate method-specific parameters
    fn validate_method_params(&self, method: &str, params: Option<&Value>) -> McpResult<()> {
        match method {
            "initialize" => {
                let params: InitializeParams = Self::decode_params(method, params)?;
                debug!(
                    "Initialize requested by {} {} (protocol {})",
                    params.client_info.name, params.client_info.version, params.protocol_version
                );
                Ok(())
            }
            "tools/call" => Self::decode_params::<CallToolParams>(method, params).map(|_| ()),
            "resources/read" => {
                Self::decode_params::<ReadResourceParams>(method, params).map(|_| ())
            }
            _ => {
                debug!("No parameter validation for method: {}", method);
                Ok(())
            }
        }
    }

    /// Decode the parameters of `method`, failing with an invalid-params error
    #[inline]
    pub fn decode_params<T: DeserializeOwned>(method: &str, params: Option<&Value>) -> McpResult<T> {
        let params = params.ok_or_else(|| McpError::InvalidParameters {
            message: format!("{} request missing parameters", method),
        })?;

        serde_json::from_value(params.clone()).map_err(|e| McpError::InvalidParameters {
            message: format!("Invalid {} parameters: {}", method, e),
        })
    }

    /// Check if a protocol version is supported
    #[inline]
    pub fn is_protocol_version_supported(&self, version: &str) -> bool {
        self.supported_versions.contains(&version)
    }

    /// Get supported protocol versions
    #[inline]
    pub fn supported_protocol_versions(&self) -> &[&'static str] {
        &self.supported_versions
    }
}

impl Default for McpValidator {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
