//! JSON-RPC protocol implementation and lifecycle management.

pub mod capabilities;
pub mod codec;
pub mod constants;
pub mod jsonrpc;
pub mod lifecycle;
pub mod messages;
pub mod version;

pub use capabilities::{
    CapabilityRegistry, ClientCapabilities, LoggingCapability, PrimitiveCounts,
    PromptsCapability, ResourcesCapability, RootsCapability, ServerCapabilities, ToolsCapability,
};
pub use codec::{decode_message, decode_notification, decode_request, DecodeError, Inbound};
pub use jsonrpc::{
    error_codes, mcp_error_codes, JsonRpcError, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId,
};
pub use lifecycle::{LifecycleEvent, LifecycleManager, LifecycleState};
pub use messages::{
    CancelledNotification, ClientInfo, InitializeRequest, InitializeResponse, ServerInfo,
    ShutdownRequest,
};
pub use version::ProtocolVersion;
