use crate::dispatch::Dispatcher;
use crate::events::EventBus;
use crate::history::CallHistory;
use crate::mock::Schmock;
use crate::plugin::{Plugin, PluginRegistry};
use crate::request::{BodyPrintLimit, State, BODY_PRINT_LIMIT};
use crate::route_table::{compile, RouteDefinition};
use crate::{BoxError, SchmockError};
use log::debug;
use serde_json::Value;
use std::env;
use std::time::Duration;

/// A builder providing a fluent API to assemble a [`Schmock`] step-by-step.
/// Use [`Schmock::builder`] to get started.
///
/// Nothing is validated until [`SchmockBuilder::build`]: it parses every route key,
/// compiles the route table and reports the first registration failure, if any.
pub struct SchmockBuilder {
    namespace: Option<String>,
    routes: Vec<(String, RouteDefinition)>,
    plugins: PluginRegistry,
    registration_error: Option<SchmockError>,
    state: Value,
    delay: Option<Duration>,
    record_calls: bool,
    body_print_limit: BodyPrintLimit,
}

impl SchmockBuilder {
    pub(super) fn new() -> Self {
        let body_print_limit = match env::var("SCHMOCK_BODY_PRINT_LIMIT")
            .ok()
            .and_then(|x| x.parse::<usize>().ok())
        {
            Some(limit) => BodyPrintLimit::Limited(limit),
            None => BodyPrintLimit::Limited(BODY_PRINT_LIMIT),
        };
        Self {
            namespace: None,
            routes: vec![],
            plugins: PluginRegistry::new(),
            registration_error: None,
            state: Value::Null,
            delay: None,
            record_calls: true,
            body_print_limit,
        }
    }

    /// Prefix every route path with `namespace`, e.g. `/api/v1`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The initial value of the [`State`] shared by every call.
    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = state.into();
        self
    }

    /// Register a route. Routes are matched in registration order: the first one that
    /// accepts a request answers it.
    pub fn route(mut self, key: impl Into<String>, definition: impl Into<RouteDefinition>) -> Self {
        self.routes.push((key.into(), definition.into()));
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        let outcome = self.plugins.register(plugin);
        self.keep_first_error(outcome);
        self
    }

    /// Invoke `factory` right away and register the plugin it builds.
    pub fn plugin_with<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> Result<Plugin, BoxError>,
    {
        let outcome = self.plugins.register_with(factory);
        self.keep_first_error(outcome);
        self
    }

    /// Delay every response by `delay`, unless its route sets its own.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// By default, every handled call is recorded and can be inspected with
    /// [`Schmock::history`].
    ///
    /// Recording can be turned off for mocks handling a large number of calls.
    pub fn disable_request_recording(mut self) -> Self {
        self.record_calls = false;
        self
    }

    /// The maximum size of request bodies printed in debug logs.
    ///
    /// Defaults to the value of `SCHMOCK_BODY_PRINT_LIMIT`, or 10 000 bytes.
    pub fn body_print_limit(mut self, limit: BodyPrintLimit) -> Self {
        self.body_print_limit = limit;
        self
    }

    pub fn build(self) -> Result<Schmock, SchmockError> {
        if let Some(error) = self.registration_error {
            return Err(error);
        }

        let routes = compile(
            self.routes,
            self.namespace.as_deref(),
            self.plugins.has_generator(),
        )?;
        let plugins = self.plugins.into_ordered();
        debug!(
            "Built a mock with {} routes and {} plugins",
            routes.len(),
            plugins.len()
        );

        let dispatcher = Dispatcher {
            routes,
            plugins,
            events: EventBus::new(),
            state: State::new(self.state),
            body_print_limit: self.body_print_limit,
        };
        let history = self.record_calls.then(CallHistory::default);
        Ok(Schmock::new(dispatcher, history, self.delay))
    }

    fn keep_first_error(&mut self, outcome: Result<(), SchmockError>) {
        if let Err(error) = outcome {
            self.registration_error.get_or_insert(error);
        }
    }
}
