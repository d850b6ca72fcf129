//! Common imports for building MCP servers.

pub use mcpkit_core::config::{LogLevel, RuntimeConfig};
pub use mcpkit_core::error::{McpError, McpResult};
pub use mcpkit_core::protocol::{
    ClientCapabilities, InitializeRequest, InitializeResponse, JsonRpcError, JsonRpcMessage,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LifecycleEvent, LifecycleState,
    RequestId, ServerCapabilities, ServerInfo,
};
pub use mcpkit_core::types::{
    GetPromptResponse, Prompt, PromptArgument, PromptMessage, Resource, ResourceContent,
    ResourceHit, ResourceMetadata, Tool, ToolCallResponse, ToolContent,
};
pub use mcpkit_core::utils::{Uri, UriPattern};

pub use mcpkit_server::{
    ErrorMapperMiddleware, LoggingMiddleware, McpServer, Middleware, Next, PromptHandler,
    RateLimitMiddleware, RateLimiter, RequestContext, ResourceProvider, ResourceStore,
    ToolHandler, UriValidator,
};

pub use mcpkit_transport::{StdioTransport, Transport, TransportOrchestrator};
