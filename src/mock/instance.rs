use crate::dispatch::Dispatcher;
use crate::events::{Event, EventKind, ListenerId};
use crate::history::{CallHistory, RecordedCall};
use crate::mock::SchmockBuilder;
use crate::request::{RequestOptions, State};
use crate::route_table::RouteTable;
use crate::{BoxError, Response};
use futures_timer::Delay;
use http::Method;
use serde_json::Value;
use std::time::Duration;

/// An in-process stand-in for an HTTP service.
///
/// A `Schmock` never opens a socket: requests are function calls to [`Schmock::handle`],
/// which runs them through the route table and the plugin pipeline and always returns a
/// [`Response`], errors included.
///
/// ```rust
/// use schmock::{RequestOptions, Schmock};
/// use http::Method;
/// use serde_json::json;
///
/// # async_std::task::block_on(async {
/// let mock = Schmock::builder()
///     .route("POST /users", json!([201, {"id": 1}, {"Location": "/users/1"}]))
///     .build()
///     .unwrap();
///
/// let response = mock
///     .handle(Method::POST, "/users", RequestOptions::new().body(json!({"name": "ada"})))
///     .await;
/// assert_eq!(response.status, 201);
/// assert_eq!(response.headers["Location"], "/users/1");
///
/// let response = mock.get("/nowhere").await;
/// assert_eq!(response.status, 404);
/// # })
/// ```
///
/// ## Sharing
///
/// `Schmock` is `Send + Sync`: wrap it in an `Arc` to handle calls from several tasks.
/// Calls interleave freely; the shared [`State`] offers no transaction across them.
#[derive(Debug)]
pub struct Schmock {
    dispatcher: Dispatcher,
    history: Option<CallHistory>,
    delay: Option<Duration>,
}

impl Schmock {
    pub(super) fn new(
        dispatcher: Dispatcher,
        history: Option<CallHistory>,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            dispatcher,
            history,
            delay,
        }
    }

    /// Start assembling a `Schmock`.
    pub fn builder() -> SchmockBuilder {
        SchmockBuilder::new()
    }

    /// Handle a request as if it had been received over HTTP.
    ///
    /// `path` may carry a `?query` suffix: it is decoded and merged into `options.query`,
    /// with `options.query` winning on conflicts. The path itself is not decoded.
    pub async fn handle(&self, method: Method, path: &str, options: RequestOptions) -> Response {
        let dispatched = self.dispatcher.dispatch(method, path, options).await;

        let delay = dispatched
            .request
            .route
            .as_ref()
            .and_then(|route| route.config.delay)
            .or(self.delay);

        let response = dispatched.response.clone();
        if let Some(history) = &self.history {
            history.record(RecordedCall::new(dispatched.request, dispatched.response));
        }
        if let Some(delay) = delay {
            Delay::new(delay).await;
        }
        response
    }

    /// Shorthand for a `GET` without headers or body.
    pub async fn get(&self, path: &str) -> Response {
        self.handle(Method::GET, path, RequestOptions::new()).await
    }

    /// Shorthand for a `POST` with a JSON body.
    pub async fn post(&self, path: &str, body: impl Into<Value>) -> Response {
        self.handle(Method::POST, path, RequestOptions::new().body(body))
            .await
    }

    /// Subscribe to lifecycle events. See [`Event`].
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.dispatcher.events.on(kind, listener)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.dispatcher.events.off(kind, id)
    }

    /// The state shared by every call handled by this mock.
    pub fn state(&self) -> &State {
        &self.dispatcher.state
    }

    pub fn routes(&self) -> &RouteTable {
        &self.dispatcher.routes
    }

    /// Every call handled so far, oldest first.
    ///
    /// Returns `None` if request recording was disabled with
    /// [`SchmockBuilder::disable_request_recording`].
    pub fn history(&self) -> Option<Vec<RecordedCall>> {
        self.history.as_ref().map(CallHistory::calls)
    }

    /// Whether at least one call to `method path` was handled, path without query.
    ///
    /// Always `false` if request recording is disabled.
    pub fn called(&self, method: Method, path: &str) -> bool {
        self.call_count_for(method, path) > 0
    }

    pub fn call_count(&self) -> usize {
        self.history.as_ref().map_or(0, CallHistory::len)
    }

    pub fn call_count_for(&self, method: Method, path: &str) -> usize {
        self.history
            .as_ref()
            .map_or(0, |history| history.count(&method, path))
    }

    /// Forget every recorded call. Routes, plugins and state are left untouched.
    pub fn reset_history(&self) {
        if let Some(history) = &self.history {
            history.reset();
        }
    }
}
