//! Route definitions, the route compiler and the matcher over the compiled table.
use crate::request::ResponseContext;
use crate::route_key::{parse_route_key, ParsedRoute};
use crate::{BoxError, Response, SchmockError};
use futures::future::BoxFuture;
use futures::FutureExt;
use http::Method;
use log::debug;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type Handler =
    Arc<dyn Fn(ResponseContext) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// What produces the payload of a route.
#[derive(Clone)]
pub(crate) enum Responder {
    Value(Value),
    Handler(Handler),
}

/// Per-route overrides, applied around the dispatch pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteConfig {
    /// Overrides the mock-wide delay for this route.
    pub delay: Option<Duration>,
    /// Set as the `content-type` header unless the response already carries one.
    pub content_type: Option<String>,
    /// Opaque data for `generate` hooks, e.g. a schema to fake the payload from.
    pub extra: Map<String, Value>,
}

/// The right-hand side of a route: what to respond with, plus per-route configuration.
///
/// ```rust
/// use schmock::{RouteDefinition, Schmock};
/// use serde_json::json;
///
/// # async_std::task::block_on(async {
/// let mock = Schmock::builder()
///     .route("GET /health", RouteDefinition::value(json!({"ok": true})))
///     .route(
///         "GET /users/:id",
///         RouteDefinition::handler(|ctx| async move { Ok(json!({"userId": ctx.param("id")})) }),
///     )
///     .build()
///     .unwrap();
///
/// let response = mock.get("/users/7").await;
/// assert_eq!(response.body, json!({"userId": "7"}));
/// # })
/// ```
#[derive(Clone)]
pub struct RouteDefinition {
    pub(crate) responder: Option<Responder>,
    pub(crate) config: RouteConfig,
}

impl RouteDefinition {
    /// Always respond with `value`.
    ///
    /// An array starting with a number is a `[status, body, headers?]` tuple.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            responder: Some(Responder::Value(value.into())),
            config: RouteConfig::default(),
        }
    }

    /// Compute the payload from the request on every call.
    pub fn handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Self {
            responder: Some(Responder::Handler(Arc::new(move |ctx| {
                handler(ctx).boxed()
            }))),
            config: RouteConfig::default(),
        }
    }

    /// No payload of its own: a plugin's `generate` hook has to provide it.
    pub fn generated() -> Self {
        Self {
            responder: None,
            config: RouteConfig::default(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = Some(delay);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.content_type = Some(content_type.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.extra.insert(key.into(), value.into());
        self
    }
}

impl From<Value> for RouteDefinition {
    fn from(value: Value) -> Self {
        RouteDefinition::value(value)
    }
}

impl Debug for RouteDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("responder", &self.responder)
            .field("config", &self.config)
            .finish()
    }
}

impl Debug for Responder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Closures do not implement `Debug`.
        match self {
            Responder::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Responder::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// A parsed route bound to its definition. Immutable once the mock is built.
#[derive(Debug)]
pub struct CompiledRoute {
    pub route: ParsedRoute,
    pub config: RouteConfig,
    pub(crate) responder: Option<Responder>,
}

impl CompiledRoute {
    /// The key the route was registered with, e.g. `GET /users/:id`.
    pub fn key(&self) -> &str {
        &self.route.key
    }
}

/// A route that accepted a request, with the parameters it extracted.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<CompiledRoute>,
    pub params: HashMap<String, String>,
}

/// The compiled routes of a mock, in registration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
}

impl RouteTable {
    /// Find the first registered route accepting `method` and `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| &route.route.method == method)
            .find_map(|route| {
                let captures = route.route.matcher.captures(path)?;
                let mut params = HashMap::with_capacity(route.route.param_names.len());
                for (name, capture) in route.route.param_names.iter().zip(captures.iter().skip(1))
                {
                    let value = capture?.as_str();
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value.to_string());
                }
                Some(RouteMatch {
                    route: route.clone(),
                    params,
                })
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CompiledRoute>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Ensure a leading `/` and strip trailing ones. `None` if nothing is left.
pub(crate) fn normalize_namespace(namespace: &str) -> Option<String> {
    let namespace = namespace.trim().trim_end_matches('/');
    let namespace = namespace.strip_prefix('/').unwrap_or(namespace);
    if namespace.is_empty() {
        None
    } else {
        Some(format!("/{}", namespace))
    }
}

/// Parse every route key, apply the namespace and validate definitions.
///
/// `has_generator` tells whether any registered plugin can produce payloads for routes
/// without a responder of their own.
pub(crate) fn compile(
    routes: Vec<(String, RouteDefinition)>,
    namespace: Option<&str>,
    has_generator: bool,
) -> Result<RouteTable, SchmockError> {
    let namespace = namespace.and_then(normalize_namespace);
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(routes.len());

    for (key, definition) in routes {
        let fail = |reason: String| SchmockError::RouteDefinition {
            key: key.clone(),
            reason,
        };

        let mut route = parse_route_key(&key)?;
        if let Some(namespace) = &namespace {
            route = route.with_namespace(namespace)?;
        }

        match &definition.responder {
            Some(Responder::Value(Value::Array(items)))
                if items.first().is_some_and(Value::is_number) =>
            {
                Response::from_payload(Value::Array(items.clone())).map_err(&fail)?;
            }
            Some(_) => {}
            None if has_generator => {}
            None => {
                return Err(fail(
                    "no response was provided and no plugin implements `generate`".into(),
                ))
            }
        }
        if let Some(content_type) = &definition.config.content_type {
            if content_type.trim().is_empty() {
                return Err(fail("content type must not be empty".into()));
            }
        }
        if !seen.insert((route.method.clone(), route.path.clone())) {
            return Err(fail(format!(
                "{} {} is already registered",
                route.method, route.path
            )));
        }

        debug!("Compiled route {} as {}", key, route.matcher);
        compiled.push(Arc::new(CompiledRoute {
            route,
            config: definition.config,
            responder: definition.responder,
        }));
    }

    Ok(RouteTable { routes: compiled })
}
