//! Operation sink: a write-only observer attached to long-running work.
//!
//! Upstream fetches and bundle I/O can run for minutes; their progress lines
//! and terminal result are reported through [`RunningOperation`] handles
//! handed out by an [`OperationLogger`]. The default implementation logs via
//! `tracing`; tests use [`NoopOperation`].

use std::time::Instant;

use url::Url;

use crate::errors::ProxyError;

/// One in-flight long-running operation.
pub trait RunningOperation: Send + Sync {
    /// Record a progress line (typically a `git` stderr line).
    fn progress(&self, message: &str);

    /// Record the terminal outcome.
    fn done(&self, error: Option<&ProxyError>);
}

/// Hands out [`RunningOperation`] handles for named actions against an
/// upstream URL.
pub trait OperationLogger: Send + Sync {
    fn start(&self, action: &str, upstream: &Url) -> Box<dyn RunningOperation>;
}

// ---------------------------------------------------------------------------
// Tracing-backed implementation
// ---------------------------------------------------------------------------

/// Logs operation lifecycle and progress through `tracing`.
pub struct TracingOperationLogger;

impl OperationLogger for TracingOperationLogger {
    fn start(&self, action: &str, upstream: &Url) -> Box<dyn RunningOperation> {
        tracing::info!(action, upstream = %upstream, "starting operation");
        Box::new(TracingOperation {
            action: action.to_string(),
            upstream: upstream.clone(),
            started: Instant::now(),
        })
    }
}

struct TracingOperation {
    action: String,
    upstream: Url,
    started: Instant,
}

impl RunningOperation for TracingOperation {
    fn progress(&self, message: &str) {
        tracing::debug!(
            action = %self.action,
            upstream = %self.upstream,
            message,
            "operation progress"
        );
    }

    fn done(&self, error: Option<&ProxyError>) {
        let elapsed = self.started.elapsed();
        match error {
            Some(err) => tracing::warn!(
                action = %self.action,
                upstream = %self.upstream,
                ?elapsed,
                error = %err,
                "operation failed"
            ),
            None => tracing::info!(
                action = %self.action,
                upstream = %self.upstream,
                ?elapsed,
                "operation finished"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// No-op implementation
// ---------------------------------------------------------------------------

/// Discards everything. Used for short administrative commands and in tests.
pub struct NoopOperation;

impl RunningOperation for NoopOperation {
    fn progress(&self, _message: &str) {}
    fn done(&self, _error: Option<&ProxyError>) {}
}

/// An [`OperationLogger`] that hands out [`NoopOperation`] handles.
pub struct NoopOperationLogger;

impl OperationLogger for NoopOperationLogger {
    fn start(&self, _action: &str, _upstream: &Url) -> Box<dyn RunningOperation> {
        Box::new(NoopOperation)
    }
}
