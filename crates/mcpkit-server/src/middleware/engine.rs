//! Onion composition engine.
//!
//! Registration order defines the onion: the first-registered layer is
//! outermost. For one execution each layer's pre-segment runs in
//! registration order, then the core dispatch, then post-segments in reverse
//! as the awaits unwind. A layer short-circuits by returning without calling
//! `next`; whatever is in `ctx.response` at that point is the final word.
//!
//! The continuation handed to each layer is a [`Next`] value. Invoking it
//! more than once within the same layer is a bug the engine detects through
//! a per-frame single-flight flag, surfacing `ReentrantCall` with the
//! execution id. Failures are attributed once, at the frame that raised
//! them: an error from layer *i* (or from the core, index = chain length)
//! unwinds as `MiddlewareError::Failed {index: i, source}` so outer layers
//! can diagnose without guessing.
//!
//! An optional deadline covers the whole execution. Each frame arms the same
//! deadline, so the elapse fires at the deepest frame still pending and the
//! resulting `Timeout {timeout_ms, index}` passes through outer frames
//! untouched.

use crate::context::RequestContext;
use crate::middleware::Middleware;
use mcpkit_core::error::{McpError, McpResult, MiddlewareError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The innermost callable of the onion.
#[async_trait::async_trait]
pub trait CoreDispatch: Send + Sync {
    async fn dispatch(&self, ctx: &mut RequestContext) -> McpResult<()>;
}

struct ExecutionState {
    execution_id: String,
    /// One single-flight flag per frame (layers plus the core).
    entered: Vec<AtomicBool>,
    deadline: Option<tokio::time::Instant>,
    timeout_ms: Option<u64>,
}

impl ExecutionState {
    fn timeout_error(&self, index: usize) -> McpError {
        McpError::Middleware(MiddlewareError::Timeout {
            timeout_ms: self.timeout_ms.unwrap_or_default(),
            index,
        })
    }
}

/// Wrap an error at the frame that raised it, exactly once.
fn attribute(index: usize, error: McpError) -> McpError {
    match error {
        already @ McpError::Middleware(_) => already,
        other => McpError::Middleware(MiddlewareError::Failed {
            index,
            source: Box::new(other),
        }),
    }
}

/// Continuation into the rest of the onion.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    core: &'a dyn CoreDispatch,
    execution: &'a ExecutionState,
    /// Frame this continuation drives: `chain[index]`, or the core when
    /// `index == chain.len()`.
    index: usize,
}

impl<'a> Next<'a> {
    /// Run the next layer (or the core) of the onion.
    pub async fn run(&self, ctx: &mut RequestContext) -> McpResult<()> {
        if self.execution.entered[self.index].swap(true, Ordering::SeqCst) {
            return Err(McpError::Middleware(MiddlewareError::ReentrantCall {
                execution_id: self.execution.execution_id.clone(),
            }));
        }

        if let Some(deadline) = self.execution.deadline {
            if tokio::time::Instant::now() >= deadline {
                return Err(self.execution.timeout_error(self.index));
            }
        }

        let inner = async {
            if self.index < self.chain.len() {
                let layer = &self.chain[self.index];
                let next = Next {
                    chain: self.chain,
                    core: self.core,
                    execution: self.execution,
                    index: self.index + 1,
                };
                layer
                    .handle(ctx, next)
                    .await
                    .map_err(|e| attribute(self.index, e))
            } else {
                self.core
                    .dispatch(ctx)
                    .await
                    .map_err(|e| attribute(self.index, e))
            }
        };

        match self.execution.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, inner).await {
                Ok(result) => result,
                Err(_) => Err(self.execution.timeout_error(self.index)),
            },
            None => inner.await,
        }
    }

    /// Identifier of the current execution, stable across the whole chain.
    pub fn execution_id(&self) -> &str {
        &self.execution.execution_id
    }
}

/// Composes the registered layers around a core dispatch.
pub struct MiddlewareEngine {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareEngine {
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self { layers }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Drive one execution of the onion for `ctx`.
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        core: &dyn CoreDispatch,
        timeout: Option<Duration>,
    ) -> McpResult<()> {
        let execution = ExecutionState {
            execution_id: Uuid::new_v4().to_string(),
            entered: (0..=self.layers.len()).map(|_| AtomicBool::new(false)).collect(),
            deadline: timeout.map(|t| tokio::time::Instant::now() + t),
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
        };
        let next = Next {
            chain: &self.layers,
            core,
            execution: &execution,
            index: 0,
        };
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationRegistry;
    use crate::context::TransportInfo;
    use async_trait::async_trait;
    use mcpkit_core::protocol::{JsonRpcMessage, JsonRpcRequest, RequestId};
    use mcpkit_transport::ResponseSink;
    use serde_json::json;
    use std::sync::Mutex;

    struct NullSink;

    #[async_trait]
    impl ResponseSink for NullSink {
        async fn send(&self, _message: JsonRpcMessage) -> mcpkit_transport::Result<()> {
            Ok(())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::for_request(
            JsonRpcRequest::new("tools/list", None, RequestId::number(1)),
            Arc::new(NullSink),
            TransportInfo::default(),
            Arc::new(CancellationRegistry::new()),
        )
    }

    type Trace = Arc<Mutex<Vec<String>>>;

    /// Layer that records pre/post entries and optionally misbehaves.
    struct Probe {
        label: String,
        trace: Trace,
        fail_before_next: bool,
        fail_after_next: bool,
        skip_next: bool,
        call_next_twice: bool,
    }

    impl Probe {
        fn new(label: &str, trace: &Trace) -> Self {
            Self {
                label: label.to_string(),
                trace: trace.clone(),
                fail_before_next: false,
                fail_after_next: false,
                skip_next: false,
                call_next_twice: false,
            }
        }
    }

    #[async_trait]
    impl Middleware for Probe {
        async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> McpResult<()> {
            self.trace.lock().unwrap().push(format!("{}:pre", self.label));
            if self.fail_before_next {
                return Err(McpError::internal_error("pre failure"));
            }
            if self.skip_next {
                ctx.respond_success(json!({"shortCircuit": self.label}));
                return Ok(());
            }
            let result = next.run(ctx).await;
            if self.call_next_twice {
                let second = next.run(ctx).await;
                self.trace
                    .lock()
                    .unwrap()
                    .push(format!("{}:second={}", self.label, second.is_err()));
                second?;
            }
            self.trace.lock().unwrap().push(format!(
                "{}:post={}",
                self.label,
                if result.is_ok() { "ok" } else { "err" }
            ));
            if self.fail_after_next {
                result?;
                return Err(McpError::internal_error("post failure"));
            }
            result
        }
    }

    struct OkCore {
        trace: Trace,
    }

    #[async_trait]
    impl CoreDispatch for OkCore {
        async fn dispatch(&self, ctx: &mut RequestContext) -> McpResult<()> {
            self.trace.lock().unwrap().push("core".to_string());
            ctx.respond_success(json!({"ok": true}));
            Ok(())
        }
    }

    struct SlowCore;

    #[async_trait]
    impl CoreDispatch for SlowCore {
        async fn dispatch(&self, _ctx: &mut RequestContext) -> McpResult<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_onion_ordering() {
        let trace: Trace = Arc::default();
        let engine = MiddlewareEngine::new(vec![
            Arc::new(Probe::new("outer", &trace)),
            Arc::new(Probe::new("inner", &trace)),
        ]);
        let mut ctx = ctx();
        engine
            .run(&mut ctx, &OkCore { trace: trace.clone() }, None)
            .await
            .unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["outer:pre", "inner:pre", "core", "inner:post=ok", "outer:post=ok"]
        );
        assert!(ctx.response.is_some());
    }

    #[tokio::test]
    async fn test_short_circuit_skips_downstream() {
        let trace: Trace = Arc::default();
        let mut short = Probe::new("short", &trace);
        short.skip_next = true;
        let engine = MiddlewareEngine::new(vec![
            Arc::new(Probe::new("outer", &trace)),
            Arc::new(short),
            Arc::new(Probe::new("never", &trace)),
        ]);
        let mut ctx = ctx();
        engine
            .run(&mut ctx, &OkCore { trace: trace.clone() }, None)
            .await
            .unwrap();

        let seen = trace.lock().unwrap();
        assert!(seen.contains(&"short:pre".to_string()));
        assert!(!seen.iter().any(|entry| entry.starts_with("never")));
        assert!(!seen.contains(&"core".to_string()));
        // The short-circuiting layer's response is final.
        let response = ctx.response.unwrap();
        assert_eq!(response.result.unwrap()["shortCircuit"], json!("short"));
    }

    #[tokio::test]
    async fn test_failure_before_next_skips_deeper_layers() {
        let trace: Trace = Arc::default();
        let mut failing = Probe::new("failing", &trace);
        failing.fail_before_next = true;
        let engine = MiddlewareEngine::new(vec![
            Arc::new(Probe::new("outer", &trace)),
            Arc::new(failing),
            Arc::new(Probe::new("never", &trace)),
        ]);
        let mut ctx = ctx();
        let err = engine
            .run(&mut ctx, &OkCore { trace: trace.clone() }, None)
            .await
            .unwrap_err();

        // Attributed to the failing layer (index 1).
        match err {
            McpError::Middleware(MiddlewareError::Failed { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
        let seen = trace.lock().unwrap();
        assert!(!seen.iter().any(|entry| entry.starts_with("never")));
        // The outer layer's post-segment observed the failure.
        assert!(seen.contains(&"outer:post=err".to_string()));
    }

    #[tokio::test]
    async fn test_failure_after_next_observed_by_outer_post_segments() {
        let trace: Trace = Arc::default();
        let mut failing = Probe::new("failing", &trace);
        failing.fail_after_next = true;
        let engine = MiddlewareEngine::new(vec![
            Arc::new(Probe::new("outer", &trace)),
            Arc::new(failing),
        ]);
        let mut ctx = ctx();
        let err = engine
            .run(&mut ctx, &OkCore { trace: trace.clone() }, None)
            .await
            .unwrap_err();

        match err {
            McpError::Middleware(MiddlewareError::Failed { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
        let seen = trace.lock().unwrap();
        // The core ran, the failing layer's own post ran, and the outer layer
        // observed the throw.
        assert!(seen.contains(&"core".to_string()));
        assert!(seen.contains(&"failing:post=ok".to_string()));
        assert!(seen.contains(&"outer:post=err".to_string()));
    }

    #[tokio::test]
    async fn test_core_failure_attributed_to_core_index() {
        struct FailCore;

        #[async_trait]
        impl CoreDispatch for FailCore {
            async fn dispatch(&self, _ctx: &mut RequestContext) -> McpResult<()> {
                Err(McpError::method_not_found("nope"))
            }
        }

        let trace: Trace = Arc::default();
        let engine = MiddlewareEngine::new(vec![Arc::new(Probe::new("outer", &trace))]);
        let mut ctx = ctx();
        let err = engine.run(&mut ctx, &FailCore, None).await.unwrap_err();
        match err {
            McpError::Middleware(MiddlewareError::Failed { index, source }) => {
                assert_eq!(index, 1); // chain length == core frame
                assert!(matches!(
                    *source,
                    McpError::Protocol(mcpkit_core::ProtocolError::MethodNotFound(_))
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reentrant_next_detected() {
        let trace: Trace = Arc::default();
        let mut greedy = Probe::new("greedy", &trace);
        greedy.call_next_twice = true;
        let engine = MiddlewareEngine::new(vec![Arc::new(greedy)]);
        let mut ctx = ctx();
        let err = engine
            .run(&mut ctx, &OkCore { trace: trace.clone() }, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            McpError::Middleware(MiddlewareError::ReentrantCall { .. })
        ));
        // The second invocation failed; the first ran the core once.
        let seen = trace.lock().unwrap();
        assert_eq!(seen.iter().filter(|e| *e == "core").count(), 1);
        assert!(seen.contains(&"greedy:second=true".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_at_deepest_frame() {
        let trace: Trace = Arc::default();
        let engine = MiddlewareEngine::new(vec![
            Arc::new(Probe::new("outer", &trace)),
            Arc::new(Probe::new("inner", &trace)),
        ]);
        let mut ctx = ctx();
        let err = engine
            .run(&mut ctx, &SlowCore, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();

        match err {
            McpError::Middleware(MiddlewareError::Timeout { timeout_ms, index }) => {
                assert_eq!(timeout_ms, 50);
                // Deepest pending frame: the core (index == chain length).
                assert_eq!(index, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Post-segments observed the timeout on the way out.
        let seen = trace.lock().unwrap();
        assert!(seen.contains(&"inner:post=err".to_string()));
        assert!(seen.contains(&"outer:post=err".to_string()));
    }
}
