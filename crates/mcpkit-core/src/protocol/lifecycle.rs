//! Lifecycle state machine for the MCP handshake.
//!
//! The server moves through `Idle → Initializing → Ready → ShuttingDown →
//! Idle`. Reaching `Ready` takes two steps: an accepted `initialize` request
//! followed by the client's `notifications/initialized`. A one-shot
//! `has_been_initialized` flag survives shutdown so post-shutdown traffic can
//! be told apart from pre-handshake traffic.
//!
//! Transitions emit typed events to subscribed listeners, synchronously and
//! in subscription order, before the transition call returns. A panicking
//! listener is isolated: the panic is caught and logged, the state change
//! stands. Listeners run under the manager's lock and must not call back
//! into it.

use crate::error::{LifecycleError, McpError, McpResult};
use crate::protocol::constants::methods;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;
use tracing::warn;

/// Handshake phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Initializing,
    Ready,
    ShuttingDown,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting-down",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Events emitted on lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    InitializationStarted,
    InitializationCompleted,
    InitializationFailed,
    Ready,
    ShutdownStarted,
    ShutdownCompleted,
}

type Listener = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

struct Inner {
    state: LifecycleState,
    has_been_initialized: bool,
    listeners: Vec<Listener>,
}

/// Thread-safe lifecycle manager.
///
/// All transitions run under one write lock, which serializes concurrent
/// `initialize` attempts: the loser observes `Initializing` and fails with
/// `AlreadyInitialized`.
pub struct LifecycleManager {
    inner: RwLock<Inner>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: LifecycleState::Idle,
                has_been_initialized: false,
                listeners: Vec::new(),
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.read().expect("lifecycle lock poisoned").state
    }

    /// True once the handshake has completed at least once, even after a
    /// later shutdown returned the machine to `Idle`.
    pub fn has_been_initialized(&self) -> bool {
        self.inner
            .read()
            .expect("lifecycle lock poisoned")
            .has_been_initialized
    }

    /// Subscribe to lifecycle events. Listeners run synchronously in
    /// subscription order.
    pub fn subscribe(&self, listener: impl Fn(&LifecycleEvent) + Send + Sync + 'static) {
        self.inner
            .write()
            .expect("lifecycle lock poisoned")
            .listeners
            .push(Box::new(listener));
    }

    fn emit(inner: &Inner, event: LifecycleEvent) {
        for listener in &inner.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!(?event, "lifecycle listener panicked; state unaffected");
            }
        }
    }

    fn transition(inner: &mut Inner, to: LifecycleState) {
        let from = inner.state;
        inner.state = to;
        Self::emit(inner, LifecycleEvent::StateChanged { from, to });
    }

    /// `initialize` accepted: Idle → Initializing.
    pub fn begin_initialization(&self) -> McpResult<()> {
        let mut inner = self.inner.write().expect("lifecycle lock poisoned");
        match inner.state {
            LifecycleState::Idle => {
                Self::transition(&mut inner, LifecycleState::Initializing);
                Self::emit(&inner, LifecycleEvent::InitializationStarted);
                Ok(())
            }
            LifecycleState::Initializing | LifecycleState::Ready => {
                Err(McpError::Lifecycle(LifecycleError::AlreadyInitialized(
                    format!("initialize received in state {}", inner.state),
                )))
            }
            LifecycleState::ShuttingDown => {
                Err(McpError::Lifecycle(LifecycleError::AfterShutdown(
                    "initialize received while shutting down".to_string(),
                )))
            }
        }
    }

    /// Initialization raised an exception: Initializing → Idle (reset).
    pub fn fail_initialization(&self) -> McpResult<()> {
        let mut inner = self.inner.write().expect("lifecycle lock poisoned");
        match inner.state {
            LifecycleState::Initializing => {
                Self::transition(&mut inner, LifecycleState::Idle);
                Self::emit(&inner, LifecycleEvent::InitializationFailed);
                Ok(())
            }
            other => Err(McpError::Lifecycle(LifecycleError::InvalidStateTransition {
                from: other.name().to_string(),
                event: "initialization failure".to_string(),
            })),
        }
    }

    /// `notifications/initialized` received: Initializing → Ready.
    ///
    /// In `Ready` the notification is tolerated and ignored (the client may
    /// resend it); anywhere else it is a violation.
    pub fn complete_initialization(&self) -> McpResult<()> {
        let mut inner = self.inner.write().expect("lifecycle lock poisoned");
        match inner.state {
            LifecycleState::Initializing => {
                inner.has_been_initialized = true;
                Self::transition(&mut inner, LifecycleState::Ready);
                Self::emit(&inner, LifecycleEvent::InitializationCompleted);
                Self::emit(&inner, LifecycleEvent::Ready);
                Ok(())
            }
            LifecycleState::Ready => Ok(()),
            other => Err(McpError::Lifecycle(LifecycleError::Violation(format!(
                "initialized notification received in state {other}"
            )))),
        }
    }

    /// `shutdown`: Ready → ShuttingDown → Idle, keeping
    /// `has_been_initialized`. Idempotent from Idle.
    pub fn shutdown(&self) -> McpResult<()> {
        let mut inner = self.inner.write().expect("lifecycle lock poisoned");
        match inner.state {
            LifecycleState::Ready | LifecycleState::Initializing => {
                Self::transition(&mut inner, LifecycleState::ShuttingDown);
                Self::emit(&inner, LifecycleEvent::ShutdownStarted);
                Self::transition(&mut inner, LifecycleState::Idle);
                Self::emit(&inner, LifecycleEvent::ShutdownCompleted);
                Ok(())
            }
            // Repeat shutdown is a no-op.
            LifecycleState::Idle => Ok(()),
            LifecycleState::ShuttingDown => Ok(()),
        }
    }

    /// Check whether an operational method may run right now.
    ///
    /// `ping` and `initialize` are exempt; everything else needs `Ready`.
    /// The error kind distinguishes pre-handshake, mid-handshake, and
    /// post-shutdown rejections.
    pub fn validate_operation(&self, method: &str) -> McpResult<()> {
        if method == methods::PING || method == methods::INITIALIZE {
            return Ok(());
        }
        let inner = self.inner.read().expect("lifecycle lock poisoned");
        match inner.state {
            LifecycleState::Ready => Ok(()),
            LifecycleState::Idle if inner.has_been_initialized => Err(McpError::Lifecycle(
                LifecycleError::AfterShutdown(format!("operation {method} after shutdown")),
            )),
            LifecycleState::Idle => Err(McpError::Lifecycle(LifecycleError::NotInitialized(
                format!("operation {method} requires an initialized server"),
            ))),
            LifecycleState::Initializing => Err(McpError::Lifecycle(LifecycleError::Violation(
                format!("operation {method} while initializing"),
            ))),
            LifecycleState::ShuttingDown => Err(McpError::Lifecycle(
                LifecycleError::AfterShutdown(format!("operation {method} while shutting down")),
            )),
        }
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("state", &self.state())
            .field("has_been_initialized", &self.has_been_initialized())
            .finish()
    }
}
