//! Correlation of the log lines emitted by one admin command.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity of one admin command (a listing, a bulk action, an install).
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id attached to every event in the span.
    pub request_id: Uuid,
    /// Frontend that issued the command, e.g. `"cli"`.
    pub source: String,
    /// Command name, if known.
    pub operation: Option<String>,
    /// Start time.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Fresh context with a random id.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            source: source.into(),
            operation: None,
            started_at: Utc::now(),
        }
    }

    /// Name the command.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Milliseconds since [`RequestContext::new`]. Never negative.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0)
    }

    /// Abbreviated id for human-facing output.
    #[must_use]
    pub fn short_id(&self) -> String {
        let mut id = self.request_id.simple().to_string();
        id.truncate(8);
        id
    }

    /// `info`-level span carrying the id, source and operation.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            id = %self.short_id(),
            source = %self.source,
            op = self.operation.as_deref().unwrap_or("-"),
        )
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(op) = &self.operation {
            write!(f, " {op}")?;
        }
        write!(f, " [{}]", self.short_id())
    }
}

/// Keeps the request span entered for its lifetime.
///
/// Logs the elapsed time at `debug` when dropped.
pub struct RequestGuard {
    context: RequestContext,
    _entered: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the span of `context`.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let entered = context.span().entered();
        tracing::debug!(started_at = %context.started_at, "Request started");
        Self {
            context,
            _entered: entered,
        }
    }

    /// The context this guard was built from.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "Request finished");
    }
}
