//! # mcpkit
//!
//! Middleware-first Model Context Protocol (MCP) server framework.
//!
//! An MCP server exposes *tools* (callable operations), *resources*
//! (addressable readable artifacts), and *prompts* (parameterized text
//! generators) to an AI host over JSON-RPC 2.0. This crate re-exports the
//! full framework surface:
//!
//! - [`mcpkit_core`] — codec, lifecycle, capabilities, types, cache
//! - [`mcpkit_server`] — gate, middleware, registries, dispatcher, server
//! - [`mcpkit_transport`] — transport trait, stdio NDJSON, orchestrator
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mcpkit::prelude::*;
//! use std::sync::Arc;
//!
//! struct Greet;
//!
//! #[async_trait::async_trait]
//! impl ToolHandler for Greet {
//!     async fn call(
//!         &self,
//!         args: Option<serde_json::Value>,
//!         _ctx: &mut RequestContext,
//!     ) -> McpResult<ToolCallResponse> {
//!         let name = args
//!             .as_ref()
//!             .and_then(|a| a.get("name"))
//!             .and_then(|n| n.as_str())
//!             .unwrap_or("world");
//!         Ok(ToolCallResponse::text(format!("hello, {name}")))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> McpResult<()> {
//!     let server = McpServer::new(ServerInfo {
//!         name: "greeter".to_string(),
//!         version: "1.0.0".to_string(),
//!     });
//!     server.register_tool(Tool::new("greet", "Say hello"), Arc::new(Greet))?;
//!     server.run_stdio().await
//! }
//! ```

pub use mcpkit_core as core;
pub use mcpkit_server as server;
pub use mcpkit_transport as transport;

pub mod prelude;

pub use mcpkit_core::{McpError, McpResult};
pub use mcpkit_server::McpServer;
