//! # mcpkit-server
//!
//! Server engine for the mcpkit Model Context Protocol framework.
//!
//! The pieces, outermost first, for one inbound frame:
//!
//! ```text
//! transport → Dispatcher (decode → RequestGate) → MiddlewareEngine
//!     → CoreRouter (handshake | tools | resources | prompts) → response
//! ```
//!
//! - [`gate`]: classifies inbound methods and admits them per lifecycle state
//! - [`middleware`]: onion composition with short-circuit, reentrancy
//!   detection, failure attribution, and per-request deadlines
//! - [`dispatcher`]: binds transports to the gate, engine, and core routing
//! - [`registry`]: tool/resource/prompt tables with URI pattern matching
//! - [`store`]: LRU-backed resource provider
//! - [`handshake`]: `initialize`, `notifications/initialized`, `shutdown`
//! - [`server`]: [`McpServer`], the assembled result
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcpkit_server::McpServer;
//! use mcpkit_core::protocol::ServerInfo;
//!
//! #[tokio::main]
//! async fn main() -> mcpkit_core::McpResult<()> {
//!     let server = McpServer::new(ServerInfo {
//!         name: "notes".to_string(),
//!         version: "1.0.0".to_string(),
//!     });
//!     server.run_stdio().await
//! }
//! ```

pub mod cancellation;
pub mod context;
pub mod dispatcher;
pub mod gate;
pub mod handlers;
pub mod handshake;
pub mod logging;
pub mod middleware;
pub mod registry;
pub mod server;
pub mod store;

pub use cancellation::CancellationRegistry;
pub use context::{RequestContext, TransportInfo};
pub use dispatcher::{CoreRouter, Dispatcher};
pub use gate::{classify, GateRejection, MethodClass, RequestGate};
pub use handlers::{PromptHandler, PromptValidator, ResourceProvider, ToolHandler, UriValidator};
pub use handshake::HandshakeHandler;
pub use logging::init_logging;
pub use middleware::{
    CoreDispatch, ErrorMapperMiddleware, LoggingMiddleware, Middleware, MiddlewareEngine,
    MiddlewareRegistry, Next, RateLimitMiddleware, RateLimiter,
};
pub use registry::{
    PromptRegistration, PromptRegistry, RegistrySet, ResourceRegistration, ResourceRegistry,
    ToolRegistration, ToolRegistry,
};
pub use server::McpServer;
pub use store::ResourceStore;
