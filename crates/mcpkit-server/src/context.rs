//! Per-request handler context.
//!
//! A context is built by the dispatcher for each inbound frame and destroyed
//! when the middleware chain unwinds. It carries the frame, transport
//! details, the response slot, and a free-form `state` map that middleware
//! and handlers share within this one request — nothing in it survives the
//! request.

use crate::cancellation::CancellationRegistry;
use mcpkit_core::error::McpResult;
use mcpkit_core::protocol::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use mcpkit_transport::{PeerInfo, ResponseSink, TransportMetadata};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Transport identity attached to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportInfo {
    pub name: String,
    pub peer: Option<PeerInfo>,
}

impl From<TransportMetadata> for TransportInfo {
    fn from(metadata: TransportMetadata) -> Self {
        Self {
            name: metadata.transport,
            peer: metadata.peer,
        }
    }
}

/// Context threaded through the middleware onion and into handlers.
pub struct RequestContext {
    message: JsonRpcMessage,
    pub transport: TransportInfo,
    /// Request-scoped scratchpad shared along the chain.
    pub state: HashMap<String, Value>,
    /// The response that will be sent when the chain unwinds, if any.
    pub response: Option<JsonRpcResponse>,
    sink: Arc<dyn ResponseSink>,
    cancellations: Arc<CancellationRegistry>,
}

impl RequestContext {
    pub fn for_request(
        request: JsonRpcRequest,
        sink: Arc<dyn ResponseSink>,
        transport: TransportInfo,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            message: JsonRpcMessage::Request(request),
            transport,
            state: HashMap::new(),
            response: None,
            sink,
            cancellations,
        }
    }

    pub fn for_notification(
        notification: JsonRpcNotification,
        sink: Arc<dyn ResponseSink>,
        transport: TransportInfo,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            message: JsonRpcMessage::Notification(notification),
            transport,
            state: HashMap::new(),
            response: None,
            sink,
            cancellations,
        }
    }

    pub fn method(&self) -> &str {
        self.message.method().unwrap_or_default()
    }

    pub fn params(&self) -> Option<&Value> {
        match &self.message {
            JsonRpcMessage::Request(req) => req.params.as_ref(),
            JsonRpcMessage::Notification(n) => n.params.as_ref(),
            JsonRpcMessage::Response(_) => None,
        }
    }

    /// The request id, or `None` when this context wraps a notification.
    pub fn request_id(&self) -> Option<&RequestId> {
        match &self.message {
            JsonRpcMessage::Request(req) => Some(&req.id),
            _ => None,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.message.is_notification()
    }

    pub fn message(&self) -> &JsonRpcMessage {
        &self.message
    }

    /// Write the success response for this request. Notifications accept the
    /// write but the dispatcher never sends it.
    pub fn respond_success(&mut self, result: Value) {
        let id = self.request_id().cloned().unwrap_or(RequestId::Null);
        self.response = Some(JsonRpcResponse::success(result, id));
    }

    /// Write an error response for this request.
    pub fn respond_error(&mut self, error: JsonRpcError) {
        let id = self.request_id().cloned().unwrap_or(RequestId::Null);
        self.response = Some(JsonRpcResponse::error(error, id));
    }

    /// Push an out-of-band message (e.g. a server-initiated notification)
    /// through the transport, independent of the response slot.
    pub async fn send(&self, message: JsonRpcMessage) -> McpResult<()> {
        self.sink
            .send(message)
            .await
            .map_err(|e| mcpkit_core::McpError::internal_error(format!("transport send: {e}")))
    }

    /// Whether a `notifications/cancelled` arrived for this request.
    pub fn is_cancelled(&self) -> bool {
        self.request_id()
            .map(|id| self.cancellations.is_cancelled(id))
            .unwrap_or(false)
    }

    /// The server-wide cancellation registry, for handlers that mark or
    /// poll marks for other in-flight requests.
    pub fn cancellations(&self) -> &Arc<CancellationRegistry> {
        &self.cancellations
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method())
            .field("id", &self.request_id())
            .field("transport", &self.transport.name)
            .field("has_response", &self.response.is_some())
            .finish()
    }
}
