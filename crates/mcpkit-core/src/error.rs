//! # Error Handling Module
//!
//! Typed error hierarchy for the mcpkit core crate.
//!
//! `McpError` is the canonical error type for all framework operations. It is
//! a tagged sum over the failure domains the protocol distinguishes:
//! frame-level protocol errors, lifecycle violations, middleware framework
//! failures, registry problems, and the usual serialization/IO escape
//! hatches. Every variant maps onto exactly one wire-level `JsonRpcError`
//! with a fixed numeric code:
//!
//! | Code | Kind |
//! |---|---|
//! | −32700 | Parse error |
//! | −32600 | Invalid request, AlreadyInitialized |
//! | −32601 | Method not found |
//! | −32602 | Invalid params |
//! | −32603 | Internal error, unsupported protocol version |
//! | −32000 | Lifecycle violation |
//! | −32001 | Stream timeout (middleware deadline) |
//! | −32002 | Not initialized |
//! | −32003 | After shutdown |
//! | −32004 | Rate limit |
//!
//! `LifecycleError::InvalidStateTransition` is internal-only: the request
//! gate must reject anything that could trigger it, so seeing it on the wire
//! indicates a gate bug. It degrades to an internal error if ever encoded.
//!
//! When `MCPKIT_DEBUG=1`, wire errors carry their source chain in
//! `data.detail`; otherwise `data` stays whatever the variant itself set.

use crate::protocol::jsonrpc::{error_codes, mcp_error_codes, JsonRpcError};
use thiserror::Error;

/// Canonical result type for all framework operations.
pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Middleware error: {0}")]
    Middleware(#[from] MiddlewareError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl McpError {
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::Parse(msg.into()))
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::InvalidRequest(msg.into()))
    }

    pub fn method_not_found(msg: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::MethodNotFound(msg.into()))
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::InvalidParams(msg.into()))
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::Internal(msg.into()))
    }

    pub fn unsupported_protocol_version(version: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::UnsupportedVersion(version.into()))
    }

    /// Whether this error may cross the wire at all. Transport and
    /// orchestration failures stay on the server side.
    pub fn is_wire_error(&self) -> bool {
        !matches!(
            self,
            McpError::Lifecycle(LifecycleError::InvalidStateTransition { .. })
        )
    }
}

/// Frame, routing, and parameter errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(String),
}

/// Handshake-state violations, each with its own wire code.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Server not initialized: {0}")]
    NotInitialized(String),

    #[error("Server already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Lifecycle violation: {0}")]
    Violation(String),

    #[error("Server has shut down: {0}")]
    AfterShutdown(String),

    #[error("Invalid lifecycle transition from {from} on {event}")]
    InvalidStateTransition { from: String, event: String },
}

/// Failures raised by the middleware engine itself.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("Middleware at index {index} failed: {source}")]
    Failed {
        index: usize,
        #[source]
        source: Box<McpError>,
    },

    #[error("Middleware chain timed out after {timeout_ms}ms at index {index}")]
    Timeout { timeout_ms: u64, index: usize },

    #[error("next() invoked more than once in execution {execution_id}")]
    ReentrantCall { execution_id: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
}

/// Primitive registration and lookup failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A {kind} named '{name}' is already registered")]
    Duplicate { kind: &'static str, name: String },

    #[error("Invalid {kind} name '{name}': must match ^[a-z0-9][a-z0-9_-]*$")]
    InvalidName { kind: &'static str, name: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Invalid URI pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<&McpError> for JsonRpcError {
    fn from(err: &McpError) -> Self {
        match err {
            McpError::Protocol(ProtocolError::Parse(msg)) => JsonRpcError::new(
                error_codes::PARSE_ERROR,
                format!("Parse error: {msg}"),
            ),
            McpError::Protocol(ProtocolError::InvalidRequest(msg)) => JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {msg}"),
            ),
            McpError::Protocol(ProtocolError::MethodNotFound(msg)) => JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {msg}"),
            ),
            McpError::Protocol(ProtocolError::InvalidParams(msg)) => JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {msg}"),
            ),
            McpError::Protocol(ProtocolError::Internal(msg)) => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                format!("Internal error: {msg}"),
            ),
            McpError::Protocol(ProtocolError::UnsupportedVersion(version)) => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                format!("Unsupported protocol version: {version}"),
            ),
            McpError::Lifecycle(LifecycleError::NotInitialized(msg)) => JsonRpcError::new(
                mcp_error_codes::NOT_INITIALIZED,
                format!("Server not initialized: {msg}"),
            ),
            McpError::Lifecycle(LifecycleError::AlreadyInitialized(msg)) => JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                format!("Server already initialized: {msg}"),
            ),
            McpError::Lifecycle(LifecycleError::Violation(msg)) => JsonRpcError::new(
                mcp_error_codes::LIFECYCLE_VIOLATION,
                format!("Lifecycle violation: {msg}"),
            ),
            McpError::Lifecycle(LifecycleError::AfterShutdown(msg)) => JsonRpcError::new(
                mcp_error_codes::AFTER_SHUTDOWN,
                format!("Server has shut down: {msg}"),
            ),
            // Never a legitimate wire error; degrade rather than leak state names.
            McpError::Lifecycle(LifecycleError::InvalidStateTransition { .. }) => {
                JsonRpcError::internal_error(None)
            }
            // The wrapped error's code and message surface verbatim; the
            // frame index rides along in data for diagnosis.
            McpError::Middleware(MiddlewareError::Failed { index, source }) => {
                let mut inner = JsonRpcError::from(source.as_ref());
                let mut body = match inner.data.take() {
                    Some(serde_json::Value::Object(map)) => map,
                    Some(other) => {
                        let mut map = serde_json::Map::new();
                        map.insert("data".to_string(), other);
                        map
                    }
                    None => serde_json::Map::new(),
                };
                body.insert("frameIndex".to_string(), serde_json::json!(index));
                inner.data = Some(serde_json::Value::Object(body));
                inner
            }
            McpError::Middleware(MiddlewareError::Timeout { timeout_ms, index }) => {
                JsonRpcError::new(
                    mcp_error_codes::STREAM_TIMEOUT,
                    format!("Stream operation timed out after {timeout_ms}ms"),
                )
                .with_data(serde_json::json!({"timeoutMs": timeout_ms, "index": index}))
            }
            McpError::Middleware(MiddlewareError::ReentrantCall { execution_id }) => {
                JsonRpcError::new(
                    error_codes::INTERNAL_ERROR,
                    "Internal error: middleware invoked next() more than once".to_string(),
                )
                .with_data(serde_json::json!({"executionId": execution_id}))
            }
            McpError::Middleware(MiddlewareError::RateLimited(msg)) => JsonRpcError::new(
                mcp_error_codes::RATE_LIMIT,
                format!("Rate limit exceeded: {msg}"),
            ),
            McpError::Registry(RegistryError::NotFound { kind, name }) => JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("{kind} not found: {name}"),
            ),
            McpError::Registry(e) => JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {e}"),
            ),
            McpError::Serialization(e) => JsonRpcError::new(
                error_codes::PARSE_ERROR,
                format!("Parse error: {e}"),
            ),
            McpError::Io(e) => {
                JsonRpcError::new(error_codes::INTERNAL_ERROR, format!("IO error: {e}"))
            }
            McpError::Other(e) => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                format!("Internal error: {e}"),
            ),
        }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        JsonRpcError::from(&err)
    }
}

/// Convert an error to its wire form, attaching the source chain when the
/// process runs with `MCPKIT_DEBUG=1`.
pub fn to_wire_error(err: &McpError, debug: bool) -> JsonRpcError {
    let mut rpc = JsonRpcError::from(err);
    if debug {
        let mut chain = Vec::new();
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(e) = source {
            chain.push(e.to_string());
            source = e.source();
        }
        let data = rpc.data.take();
        let mut body = match data {
            Some(serde_json::Value::Object(map)) => map,
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
            None => serde_json::Map::new(),
        };
        body.insert("debug".to_string(), serde_json::Value::Bool(true));
        body.insert("detail".to_string(), serde_json::json!(chain));
        rpc.data = Some(serde_json::Value::Object(body));
    }
    rpc
}
