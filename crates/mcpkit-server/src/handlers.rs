//! Handler traits bound into the primitive registries.
//!
//! These are the seams user code implements: a tool body, a prompt
//! generator, a resource provider. Every call receives the mutable request
//! context, so handlers can read the scratchpad, poll cancellation, or push
//! out-of-band notifications.

use crate::context::RequestContext;
use async_trait::async_trait;
use mcpkit_core::error::McpResult;
use mcpkit_core::types::{GetPromptResponse, ResourceHit, ResourceMetadata, ToolCallResponse};
use mcpkit_core::utils::Uri;
use serde_json::Value;

/// Executes `tools/call` for one registered tool.
///
/// Tool-level failures should come back as
/// `ToolCallResponse { is_error: Some(true), .. }`; returning `Err` means an
/// unhandled failure and surfaces as an internal error.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        args: Option<Value>,
        ctx: &mut RequestContext,
    ) -> McpResult<ToolCallResponse>;
}

/// Generates `prompts/get` output for one registered prompt.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn generate(
        &self,
        args: Option<serde_json::Map<String, Value>>,
        ctx: &mut RequestContext,
    ) -> McpResult<GetPromptResponse>;
}

/// Optional argument validation run before a prompt handler. Failure
/// messages surface as one invalid-params error.
pub trait PromptValidator: Send + Sync {
    fn validate(&self, args: Option<&serde_json::Map<String, Value>>) -> Result<(), Vec<String>>;
}

/// Backs `resources/read` and `resources/list` for one registered pattern.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Fetch one resource. `None` means the provider has nothing for the
    /// URI (a cache miss, a deleted entry).
    async fn get(&self, uri: &Uri, ctx: &mut RequestContext) -> McpResult<Option<ResourceHit>>;

    /// Enumerate entries this provider can serve, with cursor pagination.
    async fn list(
        &self,
        cursor: Option<String>,
        ctx: &mut RequestContext,
    ) -> McpResult<(Vec<ResourceMetadata>, Option<String>)>;
}

/// Optional URI validation consulted after pattern selection. Failure
/// messages surface as one invalid-params error.
pub trait UriValidator: Send + Sync {
    fn validate(&self, uri: &Uri) -> Result<(), Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationRegistry;
    use crate::context::TransportInfo;
    use mcpkit_core::protocol::{JsonRpcMessage, JsonRpcRequest, RequestId};
    use mcpkit_core::types::ToolContent;
    use mcpkit_transport::ResponseSink;
    use std::sync::Arc;

    struct NullSink;

    #[async_trait]
    impl ResponseSink for NullSink {
        async fn send(&self, _message: JsonRpcMessage) -> mcpkit_transport::Result<()> {
            Ok(())
        }
    }

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(
            &self,
            args: Option<Value>,
            _ctx: &mut RequestContext,
        ) -> McpResult<ToolCallResponse> {
            Ok(ToolCallResponse {
                content: vec![ToolContent::text(
                    args.map(|a| a.to_string()).unwrap_or_default(),
                )],
                is_error: None,
            })
        }
    }

    #[tokio::test]
    async fn test_tool_handler_contract() {
        let handler = EchoTool;
        let mut ctx = RequestContext::for_request(
            JsonRpcRequest::new("tools/call", None, RequestId::number(1)),
            Arc::new(NullSink),
            TransportInfo::default(),
            Arc::new(CancellationRegistry::new()),
        );
        let result = handler
            .call(Some(serde_json::json!({"x": 1})), &mut ctx)
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);
    }
}
