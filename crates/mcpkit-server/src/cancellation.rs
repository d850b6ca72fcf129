//! Cooperative cancellation marks.
//!
//! A `notifications/cancelled` notification marks its `requestId` here.
//! Handlers and middleware poll the mark through their request context;
//! nothing is interrupted forcibly. Marks for a request are dropped when its
//! context unwinds.

use mcpkit_core::protocol::RequestId;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    cancelled: Mutex<HashSet<RequestId>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, id: RequestId) {
        self.cancelled
            .lock()
            .expect("cancellation lock poisoned")
            .insert(id);
    }

    pub fn is_cancelled(&self, id: &RequestId) -> bool {
        self.cancelled
            .lock()
            .expect("cancellation lock poisoned")
            .contains(id)
    }

    /// Drop the mark once the request's context unwinds.
    pub fn release(&self, id: &RequestId) {
        self.cancelled
            .lock()
            .expect("cancellation lock poisoned")
            .remove(id);
    }
}
