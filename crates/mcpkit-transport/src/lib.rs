//! # mcpkit-transport
//!
//! Transport layer for the mcpkit Model Context Protocol framework.
//!
//! A transport owns one inbound message stream. It is started with a
//! dispatch callback and delivers every inbound frame as
//! `dispatch(inbound, sink, metadata)`, where the sink carries responses and
//! server-initiated notifications back to the peer. The framework ships the
//! stdio NDJSON transport; anything else (sockets, HTTP bridges, in-memory
//! test pipes) plugs in through the same trait.
//!
//! Transport lifecycle is a small state machine:
//!
//! ```text
//! Stopped → Starting → Running → Stopping → Stopped
//!                 ↘ Error (terminal)
//! ```
//!
//! `stop` on a stopped transport is a no-op; `start` on a running one is an
//! error. The [`orchestrator::TransportOrchestrator`] starts and stops a set
//! of transports, collecting partial failures without rolling back the
//! transports that already started.

use async_trait::async_trait;
use mcpkit_core::protocol::{Inbound, JsonRpcMessage};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod orchestrator;
pub mod stdio;

pub use orchestrator::{TransportFailure, TransportOrchestrationError, TransportOrchestrator};
pub use stdio::StdioTransport;

// Define our own Result type for this crate
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport errors. These never reach the wire; they surface to the host
/// through the orchestrator.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport '{name}' already started")]
    AlreadyStarted { name: String },

    #[error("Transport '{name}' is not running")]
    NotRunning { name: String },

    #[error("Transport '{name}' failed to start: {message}")]
    StartFailed { name: String, message: String },

    #[error("Send failed: {message}")]
    SendFailed { message: String },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Transport run states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Terminal state after a failed start or stop.
    Error(String),
}

/// Peer details a transport may know about its counterpart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
}

/// Per-message metadata handed to the dispatch callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportMetadata {
    /// Name of the transport that received the message.
    pub transport: String,
    pub peer: Option<PeerInfo>,
    /// Free-form extension data for custom transports.
    pub extensions: HashMap<String, serde_json::Value>,
}

impl TransportMetadata {
    pub fn for_transport(name: impl Into<String>) -> Self {
        Self {
            transport: name.into(),
            ..Default::default()
        }
    }
}

/// Outbound half of a connection: responses and server-initiated
/// notifications travel through here.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn send(&self, message: JsonRpcMessage) -> Result<()>;
}

/// The server side a transport feeds. One call per inbound frame; the
/// implementation owns decoding, routing, and answering via the sink.
#[async_trait]
pub trait MessageDispatch: Send + Sync {
    async fn dispatch(
        &self,
        inbound: Inbound,
        sink: Arc<dyn ResponseSink>,
        metadata: TransportMetadata,
    );
}

/// A pluggable inbound message source.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stable name used in orchestration reports and metadata.
    fn name(&self) -> &str;

    /// Begin delivering inbound messages to `dispatch`. Returns once the
    /// transport is running; delivery continues on background tasks.
    async fn start(&self, dispatch: Arc<dyn MessageDispatch>) -> Result<()>;

    /// Stop delivering messages and release the underlying stream. Must be
    /// idempotent.
    async fn stop(&self) -> Result<()>;

    /// Current lifecycle state.
    fn state(&self) -> TransportState;
}
