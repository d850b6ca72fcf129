//! Shared fixtures for the integration suites: an in-memory response sink
//! and a small notes-flavored server.

use async_trait::async_trait;
use mcpkit_core::config::RuntimeConfig;
use mcpkit_core::error::{McpError, McpResult};
use mcpkit_core::protocol::{Inbound, JsonRpcMessage, JsonRpcResponse, ServerInfo};
use mcpkit_core::types::{
    GetPromptResponse, Prompt, PromptArgument, PromptMessage, Resource, Tool, ToolCallResponse,
};
use mcpkit_server::{
    Dispatcher, McpServer, PromptHandler, PromptValidator, RequestContext, ResourceStore,
    ToolHandler,
};
use mcpkit_transport::{MessageDispatch, ResponseSink, TransportMetadata};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Collects everything the dispatcher sends.
pub struct RecordingSink {
    messages: Mutex<Vec<JsonRpcMessage>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn responses(&self) -> Vec<JsonRpcResponse> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|message| match message {
                JsonRpcMessage::Response(response) => Some(response.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_response(&self) -> Option<JsonRpcResponse> {
        self.responses().pop()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn send(&self, message: JsonRpcMessage) -> mcpkit_transport::Result<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Feed one raw NDJSON line through the dispatcher.
pub async fn send_line(dispatcher: &Dispatcher, sink: &Arc<RecordingSink>, raw: &str) {
    let sink_dyn: Arc<dyn ResponseSink> = sink.clone();
    dispatcher
        .dispatch(
            Inbound::Text(raw.to_string()),
            sink_dyn,
            TransportMetadata::for_transport("test"),
        )
        .await;
}

/// Run the two-step handshake; asserts it succeeds.
pub async fn handshake(dispatcher: &Dispatcher, sink: &Arc<RecordingSink>) {
    send_line(
        dispatcher,
        sink,
        r#"{"jsonrpc":"2.0","id":"init","method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{},"clientInfo":{"name":"test-client","version":"1"}}}"#,
    )
    .await;
    let response = sink.last_response().expect("initialize response");
    assert!(
        response.error.is_none(),
        "handshake failed: {:?}",
        response.error
    );
    send_line(
        dispatcher,
        sink,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
    )
    .await;
}

struct AddNoteTool;

#[async_trait]
impl ToolHandler for AddNoteTool {
    async fn call(
        &self,
        args: Option<Value>,
        _ctx: &mut RequestContext,
    ) -> McpResult<ToolCallResponse> {
        let text = args
            .as_ref()
            .and_then(|a| a.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        if text.is_empty() {
            return Ok(ToolCallResponse::error("note text cannot be empty"));
        }
        Ok(ToolCallResponse::text(format!("added: {text}")))
    }
}

struct BoomTool;

#[async_trait]
impl ToolHandler for BoomTool {
    async fn call(
        &self,
        _args: Option<Value>,
        _ctx: &mut RequestContext,
    ) -> McpResult<ToolCallResponse> {
        Err(McpError::internal_error("tool blew up"))
    }
}

struct SummarizePrompt;

#[async_trait]
impl PromptHandler for SummarizePrompt {
    async fn generate(
        &self,
        args: Option<serde_json::Map<String, Value>>,
        _ctx: &mut RequestContext,
    ) -> McpResult<GetPromptResponse> {
        let note = args
            .as_ref()
            .and_then(|a| a.get("note_id"))
            .and_then(|n| n.as_str())
            .unwrap_or("unknown");
        Ok(GetPromptResponse {
            description: None,
            messages: vec![PromptMessage::user(format!("Summarize note {note}"))],
        })
    }
}

struct RequireNoteId;

impl PromptValidator for RequireNoteId {
    fn validate(&self, args: Option<&serde_json::Map<String, Value>>) -> Result<(), Vec<String>> {
        match args.and_then(|a| a.get("note_id")) {
            Some(Value::String(_)) => Ok(()),
            _ => Err(vec!["note_id is required and must be a string".to_string()]),
        }
    }
}

/// A server with one tool, one failing tool, one cached resource, and one
/// prompt — enough surface for every operational route.
pub fn notes_server() -> (McpServer, Arc<ResourceStore>) {
    let server = McpServer::new(ServerInfo {
        name: "notes-server".to_string(),
        version: "0.3.0".to_string(),
    })
    .with_runtime_config(RuntimeConfig {
        no_default_transport: true,
        ..Default::default()
    });

    server
        .register_tool(Tool::new("add_note", "Add a note"), Arc::new(AddNoteTool))
        .unwrap();
    server
        .register_tool(Tool::new("boom", "Always fails"), Arc::new(BoomTool))
        .unwrap();

    let store = Arc::new(ResourceStore::new(NonZeroUsize::new(16).unwrap()));
    store.insert(
        "note://notes/welcome",
        Value::String("welcome to notes".to_string()),
        None,
        None,
    );
    server
        .register_resource(
            Resource::new("note://notes/**", "notes").with_mime_type("text/plain"),
            store.clone(),
            None,
        )
        .unwrap();

    server
        .register_prompt(
            Prompt::new("summarize")
                .with_description("Summarize a note")
                .with_argument(PromptArgument::required("note_id")),
            Arc::new(SummarizePrompt),
            Some(Arc::new(RequireNoteId)),
        )
        .unwrap();

    (server, store)
}
