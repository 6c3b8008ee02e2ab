//! Request-scoped correlation context.
//!
//! The trace middleware installs a [`RequestContext`] in tokio task-local
//! storage for each request. Domain errors read the trace identifier from it
//! and the HTTP error envelope reads the request path, so neither needs to be
//! threaded through every call.
//!
//! Task-locals are not inherited by spawned tasks. Wrap spawned work in
//! [`RequestContext::scope`] to keep correlation.

use std::future::Future;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Per-request trace identifier.
///
/// # Examples
/// ```
/// use echo_backend::domain::TraceId;
///
/// async fn handler() {
///     if let Some(id) = TraceId::current() {
///         tracing::info!(trace_id = %id, "handling request");
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a new random trace identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct a trace identifier from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the current trace identifier if one is in scope.
    #[must_use]
    pub fn current() -> Option<Self> {
        REQUEST_CONTEXT.try_with(|context| context.trace_id).ok()
    }

    /// Run `fut` with only a trace identifier in scope.
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        RequestContext::new(trace_id, None).scope(fut).await
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Correlation data for the request currently being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    trace_id: TraceId,
    path: Option<String>,
}

impl RequestContext {
    pub fn new(trace_id: TraceId, path: Option<String>) -> Self {
        Self { trace_id, path }
    }

    /// Path of the request in scope, if any.
    #[must_use]
    pub fn current_path() -> Option<String> {
        REQUEST_CONTEXT
            .try_with(|context| context.path.clone())
            .ok()
            .flatten()
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Execute `fut` with this context in scope.
    pub async fn scope<Fut>(self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        REQUEST_CONTEXT.scope(self, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_reflects_scope() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected, async move { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[tokio::test]
    async fn nothing_is_in_scope_by_default() {
        assert!(TraceId::current().is_none());
        assert!(RequestContext::current_path().is_none());
    }

    #[tokio::test]
    async fn context_exposes_path() {
        let context = RequestContext::new(TraceId::generate(), Some("/api/v1/users".to_owned()));
        let path = context.scope(async { RequestContext::current_path() }).await;
        assert_eq!(path.as_deref(), Some("/api/v1/users"));
    }

    #[tokio::test]
    async fn from_str_round_trips() {
        let uuid = Uuid::nil();
        let trace_id: TraceId = uuid.to_string().parse().expect("parse uuid");
        assert_eq!(trace_id.to_string(), uuid.to_string());
    }
}
