//! # mcpkit-core
//!
//! Core protocol engine for the mcpkit Model Context Protocol framework.
//!
//! This crate provides the foundational pieces the server and transport
//! crates are assembled from:
//!
//! - **Protocol**: JSON-RPC 2.0 frame types, a validating codec, the
//!   lifecycle state machine, capability aggregation, and handshake payloads
//! - **Types**: strongly typed tool, resource, and prompt definitions with
//!   their list/call/read/get request-response shapes
//! - **Cache**: a bounded LRU store with lazy TTL expiration and statistics
//! - **Utilities**: opaque pagination cursors and URI pattern matching
//! - **Errors**: the `McpError` hierarchy and its wire-code mapping
//!
//! ## Example
//!
//! ```rust
//! use mcpkit_core::protocol::{decode_message, Inbound, JsonRpcMessage};
//!
//! let frame = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
//! match decode_message(Inbound::from(frame)) {
//!     Ok(JsonRpcMessage::Request(req)) => assert_eq!(req.method, "ping"),
//!     other => panic!("unexpected decode outcome: {other:?}"),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod protocol;
pub mod types;
pub mod utils;

pub use error::{
    to_wire_error, LifecycleError, McpError, McpResult, MiddlewareError, ProtocolError,
    RegistryError,
};

pub use protocol::{
    decode_message, decode_notification, decode_request, error_codes, mcp_error_codes,
    CapabilityRegistry, ClientCapabilities, ClientInfo, DecodeError, Inbound, InitializeRequest,
    InitializeResponse, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, LifecycleEvent, LifecycleManager, LifecycleState, PrimitiveCounts,
    ProtocolVersion, RequestId, ServerCapabilities, ServerInfo, ShutdownRequest,
};

pub use cache::{LruStats, LruStore};
pub use config::{LogLevel, RuntimeConfig};
pub use types::{
    GetPromptRequest, GetPromptResponse, ListPromptsRequest, ListPromptsResponse,
    ListResourcesRequest, ListResourcesResponse, ListToolsRequest, ListToolsResponse, Prompt,
    PromptArgument, PromptMessage, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceContent, ResourceHit, ResourceMetadata, SubscribeRequest, Tool, ToolCallRequest,
    ToolCallResponse, ToolContent,
};
pub use utils::{Uri, UriPattern};
