//! Dispatcher: transport input → context → gate → middleware → core → response.
//!
//! One `dispatch` call handles one inbound frame end to end. The JSON-RPC
//! rules this file owns:
//!
//! - decode failures answer with the salvaged id, or `id: null` when the id
//!   is indeterminable;
//! - a gate-rejected request answers with the rejection; a gate-rejected
//!   notification is dropped silently;
//! - a request whose chain completes without writing a response gets an
//!   internal error; a notification never produces output, even on failure.

use crate::cancellation::CancellationRegistry;
use crate::context::{RequestContext, TransportInfo};
use crate::gate::RequestGate;
use crate::handshake::HandshakeHandler;
use crate::middleware::{CoreDispatch, MiddlewareEngine};
use crate::registry::RegistrySet;
use async_trait::async_trait;
use mcpkit_core::error::{to_wire_error, McpError, McpResult, RegistryError};
use mcpkit_core::protocol::constants::methods;
use mcpkit_core::protocol::{
    decode_message, CancelledNotification, Inbound, JsonRpcError, JsonRpcMessage,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LifecycleManager,
};
use mcpkit_core::types::{
    GetPromptRequest, ListPromptsRequest, ListResourcesRequest, ListToolsRequest,
    ReadResourceRequest, ReadResourceResponse, ResourceContent, SubscribeRequest, ToolCallRequest,
};
use mcpkit_core::utils::Uri;
use mcpkit_transport::{MessageDispatch, ResponseSink, TransportMetadata};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Parse optional params for list-style operations (absent params are fine).
fn parse_params<T>(params: Option<&Value>) -> McpResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match params {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| McpError::invalid_params(format!("malformed params: {e}"))),
    }
}

/// Parse required params for call-style operations.
fn require_params<T>(params: Option<&Value>, operation: &str) -> McpResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let value = params
        .ok_or_else(|| McpError::invalid_params(format!("{operation} requires params")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| McpError::invalid_params(format!("malformed {operation} params: {e}")))
}

/// The innermost dispatch: handshake or registry routing.
pub struct CoreRouter {
    handshake: Arc<HandshakeHandler>,
    registries: RegistrySet,
    cancellations: Arc<CancellationRegistry>,
}

impl CoreRouter {
    pub fn new(
        handshake: Arc<HandshakeHandler>,
        registries: RegistrySet,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            handshake,
            registries,
            cancellations,
        }
    }

    async fn call_tool(&self, ctx: &mut RequestContext) -> McpResult<Value> {
        let call: ToolCallRequest = require_params(ctx.params(), "tools/call")?;
        let registration = self.registries.tools.lookup(&call.name).ok_or_else(|| {
            McpError::Registry(RegistryError::NotFound {
                kind: "Tool",
                name: call.name.clone(),
            })
        })?;
        let result = registration.handler.call(call.arguments, ctx).await?;
        Ok(serde_json::to_value(result)?)
    }

    async fn read_resource(&self, ctx: &mut RequestContext) -> McpResult<Value> {
        let read: ReadResourceRequest = require_params(ctx.params(), "resources/read")?;
        let uri = Uri::new(read.uri);
        uri.validate()?;

        let registration = self.registries.resources.lookup(&uri).ok_or_else(|| {
            McpError::invalid_params(format!("no resource matches URI '{uri}'"))
        })?;

        if let Some(validator) = &registration.validator {
            if let Err(errors) = validator.validate(&uri) {
                return Err(McpError::invalid_params(format!(
                    "URI '{uri}' rejected: {}",
                    errors.join("; ")
                )));
            }
        }

        let provider = registration.provider.clone();
        let mime_type = registration.resource.mime_type.clone();
        let hit = provider.get(&uri, ctx).await?.ok_or_else(|| {
            McpError::invalid_params(format!("resource '{uri}' has no content"))
        })?;

        let content = match hit.data {
            Value::String(text) => ResourceContent::Text {
                uri: uri.as_str().to_string(),
                mime_type: hit.metadata.mime_type.or(mime_type),
                text,
            },
            other => ResourceContent::Text {
                uri: uri.as_str().to_string(),
                mime_type: Some("application/json".to_string()),
                text: other.to_string(),
            },
        };
        Ok(serde_json::to_value(ReadResourceResponse {
            contents: vec![content],
        })?)
    }

    async fn get_prompt(&self, ctx: &mut RequestContext) -> McpResult<Value> {
        let get: GetPromptRequest = require_params(ctx.params(), "prompts/get")?;
        let registration = self.registries.prompts.lookup(&get.name).ok_or_else(|| {
            McpError::Registry(RegistryError::NotFound {
                kind: "Prompt",
                name: get.name.clone(),
            })
        })?;

        if let Some(validator) = &registration.validator {
            if let Err(errors) = validator.validate(get.arguments.as_ref()) {
                return Err(McpError::invalid_params(format!(
                    "prompt '{}' arguments rejected: {}",
                    get.name,
                    errors.join("; ")
                )));
            }
        }

        let handler = registration.handler.clone();
        let response = handler.generate(get.arguments, ctx).await?;
        Ok(serde_json::to_value(response)?)
    }

    fn record_cancellation(&self, ctx: &mut RequestContext) -> McpResult<()> {
        let notification: CancelledNotification =
            require_params(ctx.params(), "notifications/cancelled")?;
        debug!(request_id = %notification.request_id, "cancellation received");
        ctx.state.insert(
            "cancelled.requestId".to_string(),
            serde_json::to_value(&notification.request_id)?,
        );
        self.cancellations.mark(notification.request_id);
        Ok(())
    }
}

#[async_trait]
impl CoreDispatch for CoreRouter {
    async fn dispatch(&self, ctx: &mut RequestContext) -> McpResult<()> {
        let method = ctx.method().to_string();
        match method.as_str() {
            methods::INITIALIZE => {
                let response = self.handshake.initialize(ctx.params())?;
                ctx.respond_success(serde_json::to_value(response)?);
            }
            methods::INITIALIZED => {
                self.handshake.initialized()?;
            }
            methods::SHUTDOWN => {
                self.handshake.shutdown(ctx.params())?;
                ctx.respond_success(Value::Null);
            }
            methods::PING => {
                ctx.respond_success(json!({}));
            }
            methods::CANCELLED => {
                self.record_cancellation(ctx)?;
            }
            methods::PROGRESS => {
                debug!(params = ?ctx.params(), "progress notification observed");
            }
            methods::TOOLS_LIST => {
                let request: ListToolsRequest = parse_params(ctx.params())?;
                let listing = self.registries.tools.list(request.cursor.as_deref())?;
                ctx.respond_success(serde_json::to_value(listing)?);
            }
            methods::TOOLS_CALL => {
                let result = self.call_tool(ctx).await?;
                ctx.respond_success(result);
            }
            methods::RESOURCES_LIST => {
                let request: ListResourcesRequest = parse_params(ctx.params())?;
                let listing = self.registries.resources.list(request.cursor.as_deref())?;
                ctx.respond_success(serde_json::to_value(listing)?);
            }
            methods::RESOURCES_READ => {
                let result = self.read_resource(ctx).await?;
                ctx.respond_success(result);
            }
            methods::RESOURCES_SUBSCRIBE => {
                let request: SubscribeRequest =
                    require_params(ctx.params(), "resources/subscribe")?;
                self.registries.resources.subscribe(&Uri::new(request.uri))?;
                ctx.respond_success(json!({}));
            }
            methods::PROMPTS_LIST => {
                let request: ListPromptsRequest = parse_params(ctx.params())?;
                let listing = self.registries.prompts.list(request.cursor.as_deref())?;
                ctx.respond_success(serde_json::to_value(listing)?);
            }
            methods::PROMPTS_GET => {
                let result = self.get_prompt(ctx).await?;
                ctx.respond_success(result);
            }
            other => {
                return Err(McpError::method_not_found(other));
            }
        }
        Ok(())
    }
}

/// Binds the gate, the middleware engine, and the core router to transports.
pub struct Dispatcher {
    engine: MiddlewareEngine,
    gate: RequestGate,
    lifecycle: Arc<LifecycleManager>,
    core: CoreRouter,
    cancellations: Arc<CancellationRegistry>,
    debug: bool,
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        engine: MiddlewareEngine,
        lifecycle: Arc<LifecycleManager>,
        core: CoreRouter,
        cancellations: Arc<CancellationRegistry>,
        debug: bool,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            gate: RequestGate::new(),
            lifecycle,
            core,
            cancellations,
            debug,
            request_timeout,
        }
    }

    async fn send_response(&self, sink: &Arc<dyn ResponseSink>, response: JsonRpcResponse) {
        if let Err(e) = sink.send(JsonRpcMessage::Response(response)).await {
            warn!("failed to send response: {e}");
        }
    }

    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        sink: Arc<dyn ResponseSink>,
        metadata: TransportMetadata,
    ) {
        let id = request.id.clone();
        if let Some(rejection) = self.gate.admit(
            &request.method,
            self.lifecycle.state(),
            self.lifecycle.has_been_initialized(),
        ) {
            debug!(method = %request.method, code = rejection.code, "request rejected by gate");
            self.send_response(&sink, JsonRpcResponse::error(rejection.to_error(), id))
                .await;
            return;
        }

        let mut ctx = RequestContext::for_request(
            request,
            sink.clone(),
            TransportInfo::from(metadata),
            self.cancellations.clone(),
        );

        let outcome = self
            .engine
            .run(&mut ctx, &self.core, self.request_timeout)
            .await;

        let response = match outcome {
            Ok(()) => ctx.response.take().unwrap_or_else(|| {
                JsonRpcResponse::error(
                    JsonRpcError::internal_error(Some(
                        "request produced no response".to_string(),
                    )),
                    id.clone(),
                )
            }),
            Err(error) => {
                debug!(%error, "request chain failed");
                JsonRpcResponse::error(to_wire_error(&error, self.debug), id.clone())
            }
        };
        self.send_response(&sink, response).await;
        self.cancellations.release(&id);
    }

    async fn handle_notification(
        &self,
        notification: JsonRpcNotification,
        sink: Arc<dyn ResponseSink>,
        metadata: TransportMetadata,
    ) {
        if let Some(rejection) = self.gate.admit(
            &notification.method,
            self.lifecycle.state(),
            self.lifecycle.has_been_initialized(),
        ) {
            // Notifications never elicit responses, rejected or not.
            debug!(
                method = %notification.method,
                code = rejection.code,
                "notification dropped by gate"
            );
            return;
        }

        let mut ctx = RequestContext::for_notification(
            notification,
            sink,
            TransportInfo::from(metadata),
            self.cancellations.clone(),
        );

        if let Err(error) = self
            .engine
            .run(&mut ctx, &self.core, self.request_timeout)
            .await
        {
            debug!(%error, method = %ctx.method(), "notification chain failed; no response");
        }
    }
}

#[async_trait]
impl MessageDispatch for Dispatcher {
    async fn dispatch(
        &self,
        inbound: Inbound,
        sink: Arc<dyn ResponseSink>,
        metadata: TransportMetadata,
    ) {
        let message = match decode_message(inbound) {
            Ok(message) => message,
            Err(decode_error) => {
                debug!(code = decode_error.error.code, "decode failure");
                self.send_response(&sink, decode_error.into_response()).await;
                return;
            }
        };

        match message {
            JsonRpcMessage::Request(request) => {
                self.handle_request(request, sink, metadata).await;
            }
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification, sink, metadata).await;
            }
            JsonRpcMessage::Response(_) => {
                debug!("ignoring unexpected response frame from peer");
            }
        }
    }
}
