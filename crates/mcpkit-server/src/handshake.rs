//! Handshake handlers: `initialize`, `notifications/initialized`, `shutdown`.
//!
//! `initialize` validates the payload shape before touching the lifecycle
//! (each missing field gets its own invalid-params message and leaves the
//! state alone), then transitions into `Initializing`. A well-formed but
//! unsupported protocol version fails *after* the transition, so the machine
//! resets to `Idle` exactly as an initialization exception would.

use mcpkit_core::error::{McpError, McpResult};
use mcpkit_core::protocol::version::negotiate;
use mcpkit_core::protocol::{
    CapabilityRegistry, InitializeRequest, InitializeResponse, LifecycleManager, ServerInfo,
    ShutdownRequest,
};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Owns the three handshake operations against one lifecycle manager.
pub struct HandshakeHandler {
    lifecycle: Arc<LifecycleManager>,
    capabilities: Arc<CapabilityRegistry>,
    server_info: ServerInfo,
    /// The accepted initialize request, kept for diagnostics and re-handshake
    /// comparisons.
    last_initialize: RwLock<Option<InitializeRequest>>,
}

impl HandshakeHandler {
    pub fn new(
        lifecycle: Arc<LifecycleManager>,
        capabilities: Arc<CapabilityRegistry>,
        server_info: ServerInfo,
    ) -> Self {
        Self {
            lifecycle,
            capabilities,
            server_info,
            last_initialize: RwLock::new(None),
        }
    }

    /// Handle `initialize`.
    pub fn initialize(&self, params: Option<&Value>) -> McpResult<InitializeResponse> {
        let params = params.ok_or_else(|| {
            McpError::invalid_params("initialize requires a params object")
        })?;
        let obj = params.as_object().ok_or_else(|| {
            McpError::invalid_params("initialize params must be an object")
        })?;

        let version = match obj.get("protocolVersion") {
            None => {
                return Err(McpError::invalid_params(
                    "initialize params missing protocolVersion",
                ));
            }
            Some(Value::String(version)) => version.clone(),
            Some(_) => {
                return Err(McpError::invalid_params(
                    "initialize params.protocolVersion must be a string",
                ));
            }
        };
        match obj.get("capabilities") {
            None => {
                return Err(McpError::invalid_params(
                    "initialize params missing capabilities",
                ));
            }
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(McpError::invalid_params(
                    "initialize params.capabilities must be an object",
                ));
            }
        }

        // Shape is valid: the handshake is accepted and the state moves.
        self.lifecycle.begin_initialization()?;

        if negotiate(&version).is_err() {
            let _ = self.lifecycle.fail_initialization();
            return Err(McpError::unsupported_protocol_version(version));
        }

        let request: InitializeRequest = match serde_json::from_value(params.clone()) {
            Ok(request) => request,
            Err(e) => {
                let _ = self.lifecycle.fail_initialization();
                return Err(McpError::invalid_params(format!(
                    "malformed initialize params: {e}"
                )));
            }
        };

        if let Some(info) = &request.client_info {
            info!(client = %info.name, version = %info.version, "initialize accepted");
        } else {
            info!("initialize accepted (anonymous client)");
        }
        *self
            .last_initialize
            .write()
            .expect("handshake lock poisoned") = Some(request);

        Ok(InitializeResponse {
            protocol_version: version,
            capabilities: self.capabilities.advertised(),
            server_info: self.server_info.clone(),
            instructions: None,
        })
    }

    /// Handle `notifications/initialized`.
    pub fn initialized(&self) -> McpResult<()> {
        self.lifecycle.complete_initialization()?;
        debug!("handshake complete; server ready");
        Ok(())
    }

    /// Handle `shutdown`. The reason, when present, is logged only.
    pub fn shutdown(&self, params: Option<&Value>) -> McpResult<()> {
        if let Some(params) = params {
            if let Ok(request) = serde_json::from_value::<ShutdownRequest>(params.clone()) {
                if let Some(reason) = request.reason {
                    info!(%reason, "shutdown requested");
                }
            }
        }
        self.lifecycle.shutdown()
    }

    /// The stored initialize request from the current handshake, if any.
    pub fn client_request(&self) -> Option<InitializeRequest> {
        self.last_initialize
            .read()
            .expect("handshake lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpkit_core::protocol::{JsonRpcError, LifecycleState};
    use serde_json::json;

    fn handler() -> (HandshakeHandler, Arc<LifecycleManager>) {
        let lifecycle = Arc::new(LifecycleManager::new());
        let handler = HandshakeHandler::new(
            lifecycle.clone(),
            Arc::new(CapabilityRegistry::new()),
            ServerInfo {
                name: "test-server".to_string(),
                version: "0.0.1".to_string(),
            },
        );
        (handler, lifecycle)
    }

    fn valid_params() -> Value {
        json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {"name": "c", "version": "1"}
        })
    }

    #[test]
    fn test_happy_path() {
        let (handler, lifecycle) = handler();
        let response = handler.initialize(Some(&valid_params())).unwrap();
        assert_eq!(response.protocol_version, "2025-06-18");
        assert_eq!(response.server_info.name, "test-server");
        assert_eq!(lifecycle.state(), LifecycleState::Initializing);

        handler.initialized().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Ready);
        assert_eq!(
            handler.client_request().unwrap().client_info.unwrap().name,
            "c"
        );
    }

    #[test]
    fn test_missing_fields_are_distinct_invalid_params() {
        let (handler, lifecycle) = handler();

        let err = handler.initialize(None).unwrap_err();
        assert!(err.to_string().contains("requires a params object"));

        let err = handler
            .initialize(Some(&json!({"capabilities": {}})))
            .unwrap_err();
        assert!(err.to_string().contains("missing protocolVersion"));

        let err = handler
            .initialize(Some(&json!({"protocolVersion": "2025-06-18"})))
            .unwrap_err();
        assert!(err.to_string().contains("missing capabilities"));

        let err = handler
            .initialize(Some(&json!({"protocolVersion": 7, "capabilities": {}})))
            .unwrap_err();
        assert!(err.to_string().contains("must be a string"));

        // None of these touched the state machine.
        assert_eq!(lifecycle.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_unsupported_version_resets_state() {
        let (handler, lifecycle) = handler();
        let err = handler
            .initialize(Some(&json!({
                "protocolVersion": "2023-01-01",
                "capabilities": {}
            })))
            .unwrap_err();

        let wire = JsonRpcError::from(&err);
        assert_eq!(wire.code, -32603);
        assert_eq!(wire.message, "Unsupported protocol version: 2023-01-01");
        assert_eq!(lifecycle.state(), LifecycleState::Idle);

        // A fresh, valid handshake succeeds afterwards.
        handler.initialize(Some(&valid_params())).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Initializing);
    }

    #[test]
    fn test_duplicate_initialize() {
        let (handler, _) = handler();
        handler.initialize(Some(&valid_params())).unwrap();
        let err = handler.initialize(Some(&valid_params())).unwrap_err();
        let wire = JsonRpcError::from(&err);
        assert_eq!(wire.code, -32600);
    }

    #[test]
    fn test_shutdown_idempotent_and_flag_kept() {
        let (handler, lifecycle) = handler();
        handler.initialize(Some(&valid_params())).unwrap();
        handler.initialized().unwrap();

        handler.shutdown(None).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Idle);
        assert!(lifecycle.has_been_initialized());

        handler
            .shutdown(Some(&json!({"reason": "again"})))
            .unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Idle);
    }
}
