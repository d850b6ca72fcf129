//! Request gate: admits or rejects inbound methods by lifecycle state.
//!
//! The gate is pure — it inspects the method name and the lifecycle snapshot
//! it is handed, produces either an admission or a structured rejection, and
//! touches nothing. Safe to call from any middleware.
//!
//! `shutdown` is admitted in every state: the handshake defines it as
//! idempotent from Idle, so gating it on readiness would break repeat
//! shutdowns.

use mcpkit_core::protocol::jsonrpc::{error_codes, mcp_error_codes, JsonRpcError};
use mcpkit_core::protocol::{constants::methods, LifecycleState};
use serde_json::json;

/// Gate classification buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Admitted in every state.
    AlwaysAllowed,
    /// Handshake traffic with state-dependent handling.
    Initialization,
    /// Everything else; requires `Ready`.
    Operational,
}

/// Classify a method name. Unknown methods are operational.
pub fn classify(method: &str) -> MethodClass {
    match method {
        methods::PING | methods::CANCELLED | methods::PROGRESS => MethodClass::AlwaysAllowed,
        methods::INITIALIZE | methods::INITIALIZED => MethodClass::Initialization,
        _ => MethodClass::Operational,
    }
}

/// A structured admission rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct GateRejection {
    pub code: i32,
    pub message: String,
    pub current_state: LifecycleState,
    pub operation: String,
}

impl GateRejection {
    fn new(
        code: i32,
        message: impl Into<String>,
        current_state: LifecycleState,
        operation: &str,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            current_state,
            operation: operation.to_string(),
        }
    }

    /// Wire form carrying the state snapshot in `data`.
    pub fn to_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code, self.message.clone()).with_data(json!({
            "currentState": self.current_state.name(),
            "operation": self.operation,
        }))
    }
}

/// The admission component. Stateless; the lifecycle snapshot comes in as
/// arguments so the gate itself has nothing to synchronize.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestGate;

impl RequestGate {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `method` may proceed. `None` means admitted.
    pub fn admit(
        &self,
        method: &str,
        state: LifecycleState,
        has_been_initialized: bool,
    ) -> Option<GateRejection> {
        match classify(method) {
            MethodClass::AlwaysAllowed => None,
            MethodClass::Initialization => Self::admit_initialization(method, state),
            MethodClass::Operational if method == methods::SHUTDOWN => None,
            MethodClass::Operational => {
                Self::admit_operational(method, state, has_been_initialized)
            }
        }
    }

    fn admit_initialization(method: &str, state: LifecycleState) -> Option<GateRejection> {
        if method != methods::INITIALIZE {
            // `notifications/initialized` is a transition signal; the
            // lifecycle manager owns its state checking.
            return None;
        }
        match state {
            LifecycleState::Idle => None,
            LifecycleState::Initializing | LifecycleState::Ready => Some(GateRejection::new(
                error_codes::INVALID_REQUEST,
                format!("Server already initialized: duplicate {method}"),
                state,
                method,
            )),
            LifecycleState::ShuttingDown => Some(GateRejection::new(
                mcp_error_codes::AFTER_SHUTDOWN,
                format!("Cannot {method} while the server is shutting down"),
                state,
                method,
            )),
        }
    }

    fn admit_operational(
        method: &str,
        state: LifecycleState,
        has_been_initialized: bool,
    ) -> Option<GateRejection> {
        match state {
            LifecycleState::Ready => None,
            LifecycleState::Idle if has_been_initialized => Some(GateRejection::new(
                mcp_error_codes::AFTER_SHUTDOWN,
                format!("Server has shut down; cannot handle {method}"),
                state,
                method,
            )),
            LifecycleState::Idle => Some(GateRejection::new(
                mcp_error_codes::NOT_INITIALIZED,
                format!("Server not initialized; {method} requires a completed handshake"),
                state,
                method,
            )),
            LifecycleState::Initializing => Some(GateRejection::new(
                mcp_error_codes::LIFECYCLE_VIOLATION,
                format!("Operation {method} not allowed while the handshake is in progress"),
                state,
                method,
            )),
            LifecycleState::ShuttingDown => Some(GateRejection::new(
                mcp_error_codes::AFTER_SHUTDOWN,
                format!("Server is shutting down; cannot handle {method}"),
                state,
                method,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(classify("ping"), MethodClass::AlwaysAllowed);
        assert_eq!(classify("notifications/cancelled"), MethodClass::AlwaysAllowed);
        assert_eq!(classify("notifications/progress"), MethodClass::AlwaysAllowed);
        assert_eq!(classify("initialize"), MethodClass::Initialization);
        assert_eq!(classify("notifications/initialized"), MethodClass::Initialization);
        assert_eq!(classify("tools/list"), MethodClass::Operational);
        assert_eq!(classify("no/such/method"), MethodClass::Operational);
    }

    #[test]
    fn test_idle_admissions() {
        let gate = RequestGate::new();
        assert!(gate.admit("ping", LifecycleState::Idle, false).is_none());
        assert!(gate.admit("initialize", LifecycleState::Idle, false).is_none());

        let rejection = gate
            .admit("tools/list", LifecycleState::Idle, false)
            .expect("operational traffic rejected in idle");
        assert_eq!(rejection.code, -32002);
        assert!(rejection.message.contains("not initialized"));
        assert_eq!(rejection.operation, "tools/list");
    }

    #[test]
    fn test_initializing_admissions() {
        let gate = RequestGate::new();
        assert!(gate.admit("ping", LifecycleState::Initializing, false).is_none());
        assert!(gate
            .admit("notifications/initialized", LifecycleState::Initializing, false)
            .is_none());

        let rejection = gate
            .admit("initialize", LifecycleState::Initializing, false)
            .expect("duplicate initialize rejected");
        assert_eq!(rejection.code, -32600);

        let rejection = gate
            .admit("resources/read", LifecycleState::Initializing, false)
            .expect("operational traffic rejected mid-handshake");
        assert_eq!(rejection.code, -32000);
    }

    #[test]
    fn test_ready_admissions() {
        let gate = RequestGate::new();
        assert!(gate.admit("tools/call", LifecycleState::Ready, true).is_none());
        assert!(gate
            .admit("notifications/initialized", LifecycleState::Ready, true)
            .is_none());

        let rejection = gate
            .admit("initialize", LifecycleState::Ready, true)
            .expect("re-initialize without shutdown rejected");
        assert_eq!(rejection.code, -32600);
    }

    #[test]
    fn test_post_shutdown_admissions() {
        let gate = RequestGate::new();
        // Idle again, but the one-shot flag distinguishes the rejection kind.
        let rejection = gate
            .admit("prompts/list", LifecycleState::Idle, true)
            .expect("operational traffic rejected after shutdown");
        assert_eq!(rejection.code, -32003);

        assert!(gate.admit("ping", LifecycleState::Idle, true).is_none());
        // Re-handshake after shutdown is allowed.
        assert!(gate.admit("initialize", LifecycleState::Idle, true).is_none());
    }

    #[test]
    fn test_shutdown_is_always_admitted() {
        let gate = RequestGate::new();
        for (state, flag) in [
            (LifecycleState::Idle, false),
            (LifecycleState::Idle, true),
            (LifecycleState::Initializing, false),
            (LifecycleState::Ready, true),
            (LifecycleState::ShuttingDown, true),
        ] {
            assert!(gate.admit("shutdown", state, flag).is_none());
        }
    }

    #[test]
    fn test_rejection_data_payload() {
        let gate = RequestGate::new();
        let rejection = gate
            .admit("tools/list", LifecycleState::Idle, false)
            .unwrap();
        let error = rejection.to_error();
        let data = error.data.unwrap();
        assert_eq!(data["currentState"], "idle");
        assert_eq!(data["operation"], "tools/list");
    }
}
