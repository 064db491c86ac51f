use crate::route_table::CompiledRoute;
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const BODY_PRINT_LIMIT: usize = 10_000;

/// Specifies limitations on printing request bodies when logging requests. Some bodies
/// may be too large to reasonably print and it may be desirable to limit them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyPrintLimit {
    /// Maximum length of a body to print in bytes.
    Limited(usize),
    /// There is no limit to the size of a body that may be printed.
    Unlimited,
}

/// Everything that accompanies a call to [`Schmock::handle`] apart from method and path.
///
/// [`Schmock::handle`]: crate::Schmock::handle
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub query: HashMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Split a `?query` suffix off `path`.
///
/// The query string is form-decoded; the path is returned untouched.
pub(crate) fn split_query(path: &str) -> (&str, HashMap<String, String>) {
    match path.split_once('?') {
        Some((path, query)) => (
            path,
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (path, HashMap::new()),
    }
}

/// State shared by every call handled by one mock instance.
///
/// Each `get`, `set` or `update` holds the lock for its own duration only: two concurrent
/// calls doing a read followed by a write can interleave. Use [`State::update`] when the
/// read and the write must not be split.
#[derive(Debug, Clone, Default)]
pub struct State(Arc<Mutex<Value>>);

impl State {
    pub fn new(initial: Value) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    /// A snapshot of the current value.
    pub fn get(&self) -> Value {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Scratch space shared by every hook taking part in a single call.
///
/// Clones of a context share the same store; it is dropped with the call.
#[derive(Debug, Clone, Default)]
pub struct Store(Arc<Mutex<HashMap<String, Value>>>);

impl Store {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Returns the previous value for `key`, if any.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.lock().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The request as seen by plugin hooks.
///
/// A fresh context is created for every call to [`Schmock::handle`]; `store` lives as long
/// as the call does, while `state` is a handle on the instance-wide [`State`].
///
/// [`Schmock::handle`]: crate::Schmock::handle
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    /// `None` in the context handed to `on_error` hooks.
    pub route: Option<Arc<CompiledRoute>>,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    /// Scratch space for hooks cooperating within a single call.
    pub store: Store,
    pub state: State,
    pub(crate) body_print_limit: BodyPrintLimit,
}

impl RequestContext {
    pub(crate) fn new(
        method: Method,
        path: String,
        options: RequestOptions,
        state: State,
        body_print_limit: BodyPrintLimit,
    ) -> Self {
        Self {
            method,
            path,
            route: None,
            params: HashMap::new(),
            query: options.query,
            headers: options.headers,
            body: options.body,
            store: Store::default(),
            state,
            body_print_limit,
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.method, self.path)?;
        // Sorted so that log lines are stable across runs.
        for (name, value) in self.query.iter().collect::<BTreeMap<_, _>>() {
            writeln!(f, "?{}={}", name, value)?;
        }
        for (name, value) in self.headers.iter().collect::<BTreeMap<_, _>>() {
            writeln!(f, "{}: {}", name, value)?;
        }

        let body = match &self.body {
            Some(body) => body.to_string(),
            None => return Ok(()),
        };
        match self.body_print_limit {
            BodyPrintLimit::Limited(limit) if body.len() > limit => {
                let mut end = limit;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                writeln!(f, "{}", &body[..end])?;
                writeln!(
                    f,
                    "We truncated the body because it was too large: {} bytes (limit: {} bytes)",
                    body.len(),
                    limit
                )?;
                writeln!(
                    f,
                    "Increase this limit by setting `SCHMOCK_BODY_PRINT_LIMIT`, or calling `SchmockBuilder::body_print_limit` when building your mock"
                )
            }
            _ => writeln!(f, "{}", body),
        }
    }
}

/// What a route handler gets to look at when producing a response.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub state: State,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
    pub method: Method,
    pub path: String,
}

impl ResponseContext {
    /// Shorthand for `self.params.get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl From<&RequestContext> for ResponseContext {
    fn from(context: &RequestContext) -> Self {
        Self {
            state: context.state.clone(),
            params: context.params.clone(),
            query: context.query.clone(),
            body: context.body.clone(),
            headers: context.headers.clone(),
            method: context.method.clone(),
            path: context.path.clone(),
        }
    }
}
