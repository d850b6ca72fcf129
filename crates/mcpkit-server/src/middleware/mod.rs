//! Middleware pipeline: trait, registry, engine, and built-in layers.

pub mod builtin;
pub mod engine;

pub use builtin::{ErrorMapperMiddleware, LoggingMiddleware, RateLimitMiddleware, RateLimiter};
pub use engine::{CoreDispatch, MiddlewareEngine, Next};

use crate::context::RequestContext;
use mcpkit_core::error::McpResult;
use std::sync::Arc;

/// One layer of the onion.
///
/// A layer runs its pre-segment, calls `next.run(ctx)` to continue inward,
/// then runs its post-segment against the result. Returning without calling
/// `next` short-circuits the chain. Calling `next` twice is detected and
/// rejected by the engine.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> McpResult<()>;

    /// Diagnostic name used in logs.
    fn name(&self) -> &str {
        "middleware"
    }
}

/// Ordered collection of layers; registration order is onion order.
#[derive(Default, Clone)]
pub struct MiddlewareRegistry {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer; the first registration becomes the outermost layer.
    pub fn register(&mut self, layer: Arc<dyn Middleware>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Compose the registered layers into an engine.
    pub fn engine(&self) -> MiddlewareEngine {
        MiddlewareEngine::new(self.layers.clone())
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("layers", &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>())
            .finish()
    }
}
