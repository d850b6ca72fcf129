//! Multi-transport orchestration.
//!
//! Starts and stops a set of named transports against one dispatch. Failures
//! are isolated: a transport that fails to start never rolls back the ones
//! that already started — the caller sees the full failure report and decides
//! whether to stop the survivors.

use crate::{MessageDispatch, Transport, TransportError};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// One transport's start or stop failure.
#[derive(Debug)]
pub struct TransportFailure {
    pub name: String,
    pub error: TransportError,
}

/// Partial-failure report for a start or stop sweep.
#[derive(Debug)]
pub struct TransportOrchestrationError {
    pub failures: Vec<TransportFailure>,
    pub succeeded: usize,
    pub total: usize,
}

impl std::fmt::Display for TransportOrchestrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let detail: Vec<String> = self
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.name, failure.error))
            .collect();
        write!(
            f,
            "{} of {} transports failed ({} succeeded): {}",
            self.failures.len(),
            self.total,
            self.succeeded,
            detail.join("; ")
        )
    }
}

impl std::error::Error for TransportOrchestrationError {}

/// Registry of transports sharing one dispatch.
pub struct TransportOrchestrator {
    transports: Vec<Arc<dyn Transport>>,
}

impl Default for TransportOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportOrchestrator {
    pub fn new() -> Self {
        Self {
            transports: Vec::new(),
        }
    }

    pub fn register(&mut self, transport: Arc<dyn Transport>) {
        self.transports.push(transport);
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Start every registered transport. Transports that started stay
    /// running even when others fail.
    pub async fn start_all(
        &self,
        dispatch: Arc<dyn MessageDispatch>,
    ) -> Result<(), TransportOrchestrationError> {
        let total = self.transports.len();
        let results = join_all(self.transports.iter().map(|transport| {
            let dispatch = dispatch.clone();
            async move {
                let name = transport.name().to_string();
                (name, transport.start(dispatch).await)
            }
        }))
        .await;

        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(()) => debug!("transport '{name}' started"),
                Err(error) => {
                    warn!("transport '{name}' failed to start: {error}");
                    failures.push(TransportFailure { name, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            let succeeded = total - failures.len();
            Err(TransportOrchestrationError {
                failures,
                succeeded,
                total,
            })
        }
    }

    /// Stop every registered transport, collecting partial failures.
    pub async fn stop_all(&self) -> Result<(), TransportOrchestrationError> {
        let total = self.transports.len();
        let results = join_all(self.transports.iter().map(|transport| async move {
            let name = transport.name().to_string();
            (name, transport.stop().await)
        }))
        .await;

        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(()) => debug!("transport '{name}' stopped"),
                Err(error) => {
                    warn!("transport '{name}' failed to stop: {error}");
                    failures.push(TransportFailure { name, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            let succeeded = total - failures.len();
            Err(TransportOrchestrationError {
                failures,
                succeeded,
                total,
            })
        }
    }
}
