//! Server assembly.
//!
//! `McpServer` wires the lifecycle manager, capability registry, primitive
//! registries, middleware stack, and dispatcher together, and runs the
//! result over the stdio transport. Everything is configured through the
//! fluent `with_*` methods before start; primitives may still be registered
//! afterwards, with capability changes becoming visible on the next
//! handshake.

use crate::cancellation::CancellationRegistry;
use crate::dispatcher::{CoreRouter, Dispatcher};
use crate::handlers::{PromptHandler, PromptValidator, ResourceProvider, ToolHandler, UriValidator};
use crate::handshake::HandshakeHandler;
use crate::logging::init_logging;
use crate::middleware::{Middleware, MiddlewareRegistry};
use crate::registry::RegistrySet;
use mcpkit_core::config::RuntimeConfig;
use mcpkit_core::error::{McpError, McpResult};
use mcpkit_core::protocol::{
    CapabilityRegistry, LifecycleEvent, LifecycleManager, ServerCapabilities, ServerInfo,
};
use mcpkit_core::types::{Prompt, Resource, Tool};
use mcpkit_transport::{StdioTransport, Transport, TransportOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// A fully assembled MCP server.
pub struct McpServer {
    info: ServerInfo,
    config: RuntimeConfig,
    lifecycle: Arc<LifecycleManager>,
    capabilities: Arc<CapabilityRegistry>,
    registries: RegistrySet,
    middleware: MiddlewareRegistry,
    cancellations: Arc<CancellationRegistry>,
    request_timeout: Option<Duration>,
    extra_transports: Vec<Arc<dyn Transport>>,
}

impl McpServer {
    /// Create a server with the given identity and environment-derived
    /// runtime configuration.
    pub fn new(info: ServerInfo) -> Self {
        let registries = RegistrySet::new();
        let capabilities = Arc::new(CapabilityRegistry::new());
        capabilities.set_counts_provider(Arc::new(registries.clone()));

        Self {
            info,
            config: RuntimeConfig::from_env(),
            lifecycle: Arc::new(LifecycleManager::new()),
            capabilities,
            registries,
            middleware: MiddlewareRegistry::new(),
            cancellations: Arc::new(CancellationRegistry::new()),
            request_timeout: None,
            extra_transports: Vec::new(),
        }
    }

    /// Override the environment-derived runtime configuration.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare static capability options (e.g. `resources.subscribe`).
    pub fn with_capabilities(self, capabilities: ServerCapabilities) -> Self {
        self.capabilities.declare(capabilities);
        self
    }

    /// Append a middleware layer; the first added is outermost.
    pub fn with_middleware(mut self, layer: Arc<dyn Middleware>) -> Self {
        self.middleware.register(layer);
        self
    }

    /// Apply a deadline to every request's middleware chain.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Attach an additional transport to run beside stdio.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.extra_transports.push(transport);
        self
    }

    /// Subscribe to lifecycle events.
    pub fn on_lifecycle_event(
        &self,
        listener: impl Fn(&LifecycleEvent) + Send + Sync + 'static,
    ) {
        self.lifecycle.subscribe(listener);
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn registries(&self) -> &RegistrySet {
        &self.registries
    }

    pub fn cancellations(&self) -> &Arc<CancellationRegistry> {
        &self.cancellations
    }

    /// Register a tool with its handler.
    pub fn register_tool(&self, tool: Tool, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        self.registries.tools.register(tool, handler)
    }

    /// Register a resource pattern with its provider.
    pub fn register_resource(
        &self,
        resource: Resource,
        provider: Arc<dyn ResourceProvider>,
        validator: Option<Arc<dyn UriValidator>>,
    ) -> McpResult<()> {
        self.registries.resources.register(resource, provider, validator)
    }

    /// Register a prompt with its handler.
    pub fn register_prompt(
        &self,
        prompt: Prompt,
        handler: Arc<dyn PromptHandler>,
        validator: Option<Arc<dyn PromptValidator>>,
    ) -> McpResult<()> {
        self.registries.prompts.register(prompt, handler, validator)
    }

    /// Build the dispatcher transports feed. Each call composes the current
    /// middleware registration snapshot.
    pub fn dispatcher(&self) -> Dispatcher {
        let handshake = Arc::new(HandshakeHandler::new(
            self.lifecycle.clone(),
            self.capabilities.clone(),
            self.info.clone(),
        ));
        let core = CoreRouter::new(
            handshake,
            self.registries.clone(),
            self.cancellations.clone(),
        );
        Dispatcher::new(
            self.middleware.engine(),
            self.lifecycle.clone(),
            core,
            self.cancellations.clone(),
            self.config.debug,
            self.request_timeout,
        )
    }

    /// Run over stdio until SIGINT/SIGTERM or stdin close.
    ///
    /// Returns an error when transport startup fails (the host should exit
    /// non-zero); a signal-driven stop resolves cleanly.
    pub async fn run_stdio(&self) -> McpResult<()> {
        init_logging(&self.config);
        info!(server = %self.info.name, version = %self.info.version, "starting server");

        let mut orchestrator = TransportOrchestrator::new();
        if !self.config.no_default_transport {
            orchestrator.register(Arc::new(StdioTransport::new()));
        }
        for transport in &self.extra_transports {
            orchestrator.register(transport.clone());
        }

        let dispatcher = Arc::new(self.dispatcher());
        orchestrator
            .start_all(dispatcher)
            .await
            .map_err(|e| {
                error!("transport startup failed: {e}");
                McpError::Other(anyhow::Error::new(e))
            })?;

        wait_for_termination().await;
        info!("termination signal received; shutting down");

        if let Err(e) = self.lifecycle.shutdown() {
            error!("lifecycle shutdown failed: {e}");
        }
        if let Err(e) = orchestrator.stop_all().await {
            error!("transport shutdown incomplete: {e}");
        }
        Ok(())
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("info", &self.info)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("cannot install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use async_trait::async_trait;
    use mcpkit_core::types::ToolCallResponse;
    use serde_json::Value;

    struct NoopTool;

    #[async_trait]
    impl ToolHandler for NoopTool {
        async fn call(
            &self,
            _args: Option<Value>,
            _ctx: &mut RequestContext,
        ) -> McpResult<ToolCallResponse> {
            Ok(ToolCallResponse::text("ok"))
        }
    }

    fn server() -> McpServer {
        McpServer::new(ServerInfo {
            name: "test-server".to_string(),
            version: "0.0.1".to_string(),
        })
        .with_runtime_config(RuntimeConfig::default())
    }

    #[test]
    fn test_server_identity() {
        let server = server();
        assert_eq!(server.info().name, "test-server");
    }

    #[test]
    fn test_registrations_feed_capability_counts() {
        let server = server();
        let advertised = server.capabilities.advertised();
        assert!(advertised.tools.is_none());

        server
            .register_tool(Tool::new("noop", "does nothing"), Arc::new(NoopTool))
            .unwrap();
        let advertised = server.capabilities.advertised();
        assert!(advertised.tools.is_some());
    }

    #[test]
    fn test_lifecycle_events_reachable() {
        let server = server();
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = hits.clone();
        server.on_lifecycle_event(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        server.lifecycle().begin_initialization().unwrap();
        assert!(hits.load(std::sync::atomic::Ordering::SeqCst) > 0);
    }
}
