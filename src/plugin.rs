//! Plugins: bundles of optional hooks invoked at fixed stages of [`Schmock::handle`].
//!
//! Every hook is asynchronous. A hook with nothing to await is simply an `async move` block:
//!
//! ```rust
//! use schmock::{Enforce, Plugin};
//!
//! let plugin = Plugin::new("double")
//!     .enforce(Enforce::Post)
//!     .after_generate(|payload, _ctx| async move {
//!         Ok(serde_json::json!(payload.as_i64().unwrap_or_default() * 2))
//!     });
//! assert_eq!(plugin.name(), "double");
//! ```
//!
//! [`Schmock::handle`]: crate::Schmock::handle
use crate::{BoxError, RequestContext, Response, SchmockError};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

/// The future every hook resolves to.
pub type HookFuture<T> = BoxFuture<'static, Result<T, BoxError>>;

type ContextHook<T> = Arc<dyn Fn(RequestContext) -> HookFuture<T> + Send + Sync>;
type TransformHook<T> = Arc<dyn Fn(T, RequestContext) -> HookFuture<T> + Send + Sync>;
type ErrorHook =
    Arc<dyn Fn(SchmockError, RequestContext) -> HookFuture<ErrorOutcome> + Send + Sync>;

/// Which group a plugin runs in. Groups run `Pre`, then `Normal`, then `Post`; within a
/// group plugins run in registration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Enforce {
    Pre,
    #[default]
    Normal,
    Post,
}

/// What an `on_error` hook decided to do with the error it was shown.
#[derive(Debug, Clone)]
pub enum ErrorOutcome {
    /// Recover: this response is returned as-is and no further `on_error` hook runs.
    Respond(Response),
    /// Report this error instead of the current one to the next hooks.
    Replace(SchmockError),
    /// Leave the current error untouched.
    Pass,
}

/// A named set of optional lifecycle hooks.
///
/// The hooks of all registered plugins are invoked in the same order at every stage: see
/// [`Enforce`].
#[derive(Clone)]
pub struct Plugin {
    name: String,
    version: Option<String>,
    enforce: Enforce,
    pub(crate) before_request: Option<ContextHook<RequestContext>>,
    pub(crate) before_generate: Option<ContextHook<Option<Value>>>,
    pub(crate) generate: Option<ContextHook<Option<Value>>>,
    pub(crate) after_generate: Option<TransformHook<Value>>,
    pub(crate) before_response: Option<TransformHook<Response>>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            enforce: Enforce::default(),
            before_request: None,
            before_generate: None,
            generate: None,
            after_generate: None,
            before_response: None,
            on_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn get_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn enforce(mut self, enforce: Enforce) -> Self {
        self.enforce = enforce;
        self
    }

    pub fn get_enforce(&self) -> Enforce {
        self.enforce
    }

    /// Runs before anything else. The returned context replaces the current one.
    pub fn before_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestContext, BoxError>> + Send + 'static,
    {
        self.before_request = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    /// Returning `Some(payload)` skips the route responder and every `generate` hook.
    pub fn before_generate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>, BoxError>> + Send + 'static,
    {
        self.before_generate = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    /// Produces the payload of routes registered without a response of their own.
    /// The first `Some` wins.
    pub fn generate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>, BoxError>> + Send + 'static,
    {
        self.generate = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    /// Transforms the payload. Whatever is returned becomes the payload of the next hook,
    /// `Value::Null` included.
    pub fn after_generate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.after_generate = Some(Arc::new(move |payload, ctx| hook(payload, ctx).boxed()));
        self
    }

    /// Transforms the normalized response.
    pub fn before_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Response, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
    {
        self.before_response = Some(Arc::new(move |response, ctx| hook(response, ctx).boxed()));
        self
    }

    /// Invoked when any stage after route matching fails.
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(SchmockError, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ErrorOutcome, BoxError>> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error, ctx| hook(error, ctx).boxed()));
        self
    }

    pub(crate) fn has_generate(&self) -> bool {
        self.generate.is_some()
    }
}

impl Debug for Plugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = [
            ("before_request", self.before_request.is_some()),
            ("before_generate", self.before_generate.is_some()),
            ("generate", self.generate.is_some()),
            ("after_generate", self.after_generate.is_some()),
            ("before_response", self.before_response.is_some()),
            ("on_error", self.on_error.is_some()),
        ]
        .into_iter()
        .filter_map(|(hook, present)| present.then_some(hook))
        .collect();

        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("enforce", &self.enforce)
            .field("hooks", &hooks)
            .finish()
    }
}

/// Plugins in registration order, until [`PluginRegistry::into_ordered`] sorts them.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Plugin) -> Result<(), SchmockError> {
        if plugin.name.trim().is_empty() {
            return Err(SchmockError::plugin(
                "<unnamed>",
                "a plugin must have a non-empty name".into(),
            ));
        }
        debug!(
            "Registering plugin {} ({:?}, version {})",
            plugin.name,
            plugin.enforce,
            plugin.version.as_deref().unwrap_or("unspecified")
        );
        self.plugins.push(plugin);
        Ok(())
    }

    /// Build a plugin with `factory` right away and register it.
    pub fn register_with<F>(&mut self, factory: F) -> Result<(), SchmockError>
    where
        F: FnOnce() -> Result<Plugin, BoxError>,
    {
        let plugin = factory().map_err(|e| SchmockError::plugin("<factory>", e))?;
        self.register(plugin)
    }

    pub fn has_generator(&self) -> bool {
        self.plugins.iter().any(Plugin::has_generate)
    }

    /// The execution order shared by every stage.
    pub fn into_ordered(mut self) -> Vec<Plugin> {
        // `sort_by_key` is stable: registration order survives within each group.
        self.plugins.sort_by_key(|plugin| plugin.enforce);
        self.plugins
    }
}
