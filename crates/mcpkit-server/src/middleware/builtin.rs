//! Built-in middleware layers: request logging, error mapping, and rate
//! limiting.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use mcpkit_core::error::{to_wire_error, McpError, McpResult, MiddlewareError};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Logs every request's method, outcome, and latency to the tracing
/// subscriber (stderr).
#[derive(Debug, Default)]
pub struct LoggingMiddleware {
    log_notifications: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self {
            log_notifications: true,
        }
    }

    pub fn requests_only() -> Self {
        Self {
            log_notifications: false,
        }
    }
}

#[async_trait::async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> McpResult<()> {
        let method = ctx.method().to_string();
        if ctx.is_notification() && !self.log_notifications {
            return next.run(ctx).await;
        }

        let started = Instant::now();
        debug!(method = %method, transport = %ctx.transport.name, "request started");
        let result = next.run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(()) => {
                let errored = ctx
                    .response
                    .as_ref()
                    .map(|response| response.is_error())
                    .unwrap_or(false);
                if errored {
                    warn!(method = %method, elapsed_ms, "request completed with error response");
                } else {
                    info!(method = %method, elapsed_ms, "request completed");
                }
            }
            Err(error) => warn!(method = %method, elapsed_ms, %error, "request failed"),
        }
        result
    }

    fn name(&self) -> &str {
        "logging"
    }
}

/// Converts framework errors into wire responses at the outer edge of the
/// onion, so inner layers and handlers can just propagate with `?`.
///
/// Notifications swallow the error silently, as the protocol requires.
#[derive(Debug, Default)]
pub struct ErrorMapperMiddleware {
    debug: bool,
}

impl ErrorMapperMiddleware {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

#[async_trait::async_trait]
impl Middleware for ErrorMapperMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> McpResult<()> {
        match next.run(ctx).await {
            Ok(()) => Ok(()),
            Err(error) => {
                debug!(%error, method = %ctx.method(), "mapping error to response");
                if !ctx.is_notification() {
                    ctx.respond_error(to_wire_error(&error, self.debug));
                }
                Ok(())
            }
        }
    }

    fn name(&self) -> &str {
        "error-mapper"
    }
}

/// Shared fixed-window request counter.
///
/// One limiter instance is meant to be shared across every transport of a
/// deployment: construct it once, hand out clones of the `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_minute: u32,
    // (minute bucket, count in bucket)
    window: Mutex<(u64, u32)>,
}

impl RateLimiter {
    pub fn new(max_per_minute: u32) -> Arc<Self> {
        Arc::new(Self {
            max_per_minute,
            window: Mutex::new((0, 0)),
        })
    }

    /// Count one request; false when the window is exhausted.
    pub fn try_acquire(&self) -> bool {
        let minute = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() / 60)
            .unwrap_or(0);

        let mut window = self.window.lock().expect("rate limiter lock poisoned");
        let (bucket, count) = *window;
        if bucket == minute {
            if count >= self.max_per_minute {
                return false;
            }
            *window = (minute, count + 1);
        } else {
            *window = (minute, 1);
        }
        true
    }
}

/// Rejects requests over the shared limit with the RateLimit wire code.
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> McpResult<()> {
        if !self.limiter.try_acquire() {
            return Err(McpError::Middleware(MiddlewareError::RateLimited(format!(
                "{} rejected by request limit",
                ctx.method()
            ))));
        }
        next.run(ctx).await
    }

    fn name(&self) -> &str {
        "rate-limit"
    }
}
