//! Remote filtering: the service seam, deferred results and query execution.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use crate::bus::ChangeBus;
use crate::store::CurrentFilter;

/// A failed remote query, passed unchanged to the error hook.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The service rejected the query.
    #[error("remote query rejected: {0}")]
    Rejected(String),

    /// The service's result stream ended with an error.
    #[error("remote query stream failed: {0}")]
    Stream(String),
}

/// The pending result of a remote query.
pub enum Deferred {
    /// Settles when the future completes.
    Future(BoxFuture<'static, Result<Value, RemoteError>>),
    /// Settles when the stream ends: with its last item, or its first error.
    Stream(BoxStream<'static, Result<Value, RemoteError>>),
}

impl Deferred {
    pub fn from_future(
        future: impl Future<Output = Result<Value, RemoteError>> + Send + 'static,
    ) -> Self {
        Deferred::Future(future.boxed())
    }

    pub fn from_stream(stream: impl Stream<Item = Result<Value, RemoteError>> + Send + 'static) -> Self {
        Deferred::Stream(stream.boxed())
    }

    /// An already successful result.
    pub fn resolved(response: Value) -> Self {
        Self::from_future(futures::future::ready(Ok(response)))
    }

    /// An already failed result.
    pub fn rejected(error: RemoteError) -> Self {
        Self::from_future(futures::future::ready(Err(error)))
    }

    /// Waits for the final outcome. A stream that ends without items settles with null.
    pub async fn settle(self) -> Result<Value, RemoteError> {
        match self {
            Deferred::Future(future) => future.await,
            Deferred::Stream(mut stream) => {
                let mut last = Value::Null;
                while let Some(item) = stream.next().await {
                    last = item?;
                }
                Ok(last)
            }
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Future(_) => f.write_str("Deferred::Future(..)"),
            Deferred::Stream(_) => f.write_str("Deferred::Stream(..)"),
        }
    }
}

/// What a remote service receives for each query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPayload {
    /// Every active filter, in insertion order.
    pub column_filters: Vec<CurrentFilter>,
    /// Column whose change triggered the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    /// Whether the query follows an explicit clear.
    #[serde(default)]
    pub clear_filter_triggered: bool,
    /// Whether the change asked for a query.
    #[serde(default)]
    pub should_trigger_query: bool,
}

/// A data source that filters on its side.
pub trait RemoteService: Send + Sync {
    /// Runs a query for the given filters.
    fn process(&self, payload: FilterPayload) -> Deferred;

    /// Filters the service currently applies.
    fn current_filters(&self) -> Vec<CurrentFilter>;

    /// Called before the query that clears every filter.
    fn clear_filters(&self) {}
}

type ErrorHook = Arc<dyn Fn(RemoteError) + Send + Sync>;
type PreProcessHook = Arc<dyn Fn() + Send + Sync>;
type PostProcessHook = Arc<dyn Fn(&Value) + Send + Sync>;

/// A remote service plus the hooks and timing used to drive it.
#[derive(Clone)]
pub struct BackendServiceApi {
    service: Arc<dyn RemoteService>,
    filter_typing_debounce: Option<Duration>,
    on_error: Option<ErrorHook>,
    pre_process: Option<PreProcessHook>,
    post_process: Option<PostProcessHook>,
}

impl BackendServiceApi {
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        Self {
            service,
            filter_typing_debounce: None,
            on_error: None,
            pre_process: None,
            post_process: None,
        }
    }

    /// Delays keystroke-driven queries by `delay`.
    pub fn with_typing_debounce(mut self, delay: Duration) -> Self {
        self.filter_typing_debounce = (!delay.is_zero()).then_some(delay);
        self
    }

    /// Called once with the error of every failed query.
    pub fn on_error(mut self, hook: impl Fn(RemoteError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Called before every query.
    pub fn pre_process(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.pre_process = Some(Arc::new(hook));
        self
    }

    /// Called with the response of every successful query.
    pub fn post_process(mut self, hook: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.post_process = Some(Arc::new(hook));
        self
    }

    pub fn service(&self) -> &Arc<dyn RemoteService> {
        &self.service
    }

    pub fn filter_typing_debounce(&self) -> Option<Duration> {
        self.filter_typing_debounce
    }
}

impl fmt::Debug for BackendServiceApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendServiceApi")
            .field("filter_typing_debounce", &self.filter_typing_debounce)
            .field("on_error", &self.on_error.is_some())
            .field("pre_process", &self.pre_process.is_some())
            .field("post_process", &self.post_process.is_some())
            .finish_non_exhaustive()
    }
}

/// Why a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A column's input changed, or presets were replaced.
    FilterChange,
    /// One column was cleared.
    ClearColumn,
    /// Every filter was cleared.
    ClearAll,
}

/// A scheduled remote query.
///
/// Dropping the handle does not cancel the query.
#[derive(Clone)]
pub struct QueryHandle {
    outcome: Shared<BoxFuture<'static, bool>>,
    abort: AbortHandle,
}

impl QueryHandle {
    pub(crate) fn new(task: JoinHandle<bool>) -> Self {
        let abort = task.abort_handle();
        let outcome = task.map(|joined| joined.unwrap_or(false)).boxed().shared();
        Self { outcome, abort }
    }

    /// Waits for the query to settle.
    ///
    /// Returns true if the service succeeded, false if it failed or the query
    /// was superseded before it ran.
    pub async fn settled(self) -> bool {
        self.outcome.await
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    pub(crate) fn abort(&self) {
        self.abort.abort();
    }
}

impl fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Runs one query to settlement and reports the outcome on the bus.
///
/// Failures go to the error hook and are not propagated. A clear-all query
/// emits "filter cleared" whatever the outcome.
pub(crate) async fn run_query(
    api: &BackendServiceApi,
    payload: FilterPayload,
    kind: QueryKind,
    bus: &ChangeBus,
) -> bool {
    if let Some(hook) = &api.pre_process {
        hook();
    }

    debug!(?kind, filters = payload.column_filters.len(), "processing remote filter query");
    let succeeded = match api.service.process(payload).settle().await {
        Ok(response) => {
            if let Some(hook) = &api.post_process {
                hook(&response);
            }
            bus.filter_changed.emit(&api.service.current_filters());
            true
        }
        Err(error) => {
            warn!(?kind, %error, "remote filter query failed");
            if let Some(hook) = &api.on_error {
                hook(error);
            }
            false
        }
    };

    if kind == QueryKind::ClearAll {
        bus.filter_cleared.emit(&true);
    }
    succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    #[tokio::test]
    async fn test_settle_future() {
        assert_eq!(Deferred::resolved(json!(1)).settle().await, Ok(json!(1)));
        assert_eq!(
            Deferred::rejected(RemoteError::Rejected("nope".into())).settle().await,
            Err(RemoteError::Rejected("nope".into()))
        );
    }

    #[tokio::test]
    async fn test_settle_stream_uses_last_item() {
        let deferred = Deferred::from_stream(stream::iter(vec![Ok(json!(1)), Ok(json!(2))]));
        assert_eq!(deferred.settle().await, Ok(json!(2)));
    }

    #[tokio::test]
    async fn test_settle_stream_stops_at_error() {
        let deferred = Deferred::from_stream(stream::iter(vec![
            Ok(json!(1)),
            Err(RemoteError::Stream("broken".into())),
            Ok(json!(3)),
        ]));
        assert_eq!(deferred.settle().await, Err(RemoteError::Stream("broken".into())));
    }

    #[tokio::test]
    async fn test_settle_empty_stream_is_null() {
        let deferred = Deferred::from_stream(stream::empty());
        assert_eq!(deferred.settle().await, Ok(Value::Null));
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = FilterPayload {
            column_filters: vec![CurrentFilter::new(
                "age",
                crate::filter::Operator::GreaterThan,
                vec![json!(18)],
            )],
            column_id: Some("age".into()),
            clear_filter_triggered: false,
            should_trigger_query: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            json!({
                "columnFilters": [{ "columnId": "age", "operator": "GT", "searchTerms": [18] }],
                "columnId": "age",
                "clearFilterTriggered": false,
                "shouldTriggerQuery": true,
            })
        );
    }

    #[test]
    fn test_zero_debounce_is_unset() {
        struct Nothing;
        impl RemoteService for Nothing {
            fn process(&self, _: FilterPayload) -> Deferred {
                Deferred::resolved(Value::Null)
            }
            fn current_filters(&self) -> Vec<CurrentFilter> {
                Vec::new()
            }
        }

        let api = BackendServiceApi::new(Arc::new(Nothing)).with_typing_debounce(Duration::ZERO);
        assert_eq!(api.filter_typing_debounce(), None);
    }
}
