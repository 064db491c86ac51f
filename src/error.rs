//! Errors raised while building a mock or handling a request.
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::sync::Arc;

/// The error type returned by hooks, route handlers and plugin factories.
///
/// Anything that converts into a boxed error works, including plain strings:
/// `Err("upstream failed".into())`.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Every failure `schmock` knows about.
///
/// Build-time variants ([`RouteParse`], [`RouteDefinition`], and [`Plugin`] when raised by a
/// factory) abort [`SchmockBuilder::build`].
/// Request-time variants never escape [`Schmock::handle`]: they are turned into a response
/// carrying `{"error": <message>, "code": <code>}`.
///
/// [`RouteParse`]: SchmockError::RouteParse
/// [`RouteDefinition`]: SchmockError::RouteDefinition
/// [`Plugin`]: SchmockError::Plugin
/// [`SchmockBuilder::build`]: crate::SchmockBuilder::build
/// [`Schmock::handle`]: crate::Schmock::handle
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchmockError {
    #[error("Invalid route key \"{key}\": {reason}")]
    RouteParse { key: String, reason: String },

    #[error("Invalid definition for route \"{key}\": {reason}")]
    RouteDefinition { key: String, reason: String },

    #[error("Route not found: {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("Failed to generate response for route {route}: {reason}")]
    ResponseGeneration { route: String, reason: String },

    #[error("Plugin \"{plugin}\" failed: {message}")]
    Plugin {
        plugin: String,
        message: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// An error raised by caller code (usually an `on_error` hook) with its own code.
    #[error("{message}")]
    Custom { code: String, message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl SchmockError {
    /// Wrap the failure of a hook (or factory) belonging to plugin `plugin`.
    pub fn plugin(plugin: impl Into<String>, cause: BoxError) -> Self {
        let cause: Arc<dyn StdError + Send + Sync> = Arc::from(cause);
        SchmockError::Plugin {
            plugin: plugin.into(),
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        SchmockError::Custom {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SchmockError::Internal {
            message: message.into(),
        }
    }

    /// The machine-readable code reported in error bodies.
    pub fn code(&self) -> &str {
        match self {
            SchmockError::RouteParse { .. } => "ROUTE_PARSE_ERROR",
            SchmockError::RouteDefinition { .. } => "ROUTE_DEFINITION_ERROR",
            SchmockError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            SchmockError::ResponseGeneration { .. } => "RESPONSE_GENERATION_ERROR",
            SchmockError::Plugin { .. } => "PLUGIN_ERROR",
            SchmockError::Custom { code, .. } => code,
            SchmockError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// `{"error": <message>, "code": <code>}`
    pub fn to_body(&self) -> Value {
        json!({
            "error": self.to_string(),
            "code": self.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_errors_keep_the_cause_and_the_plugin_name() {
        let error = SchmockError::plugin("auth", "X failed".into());

        assert_eq!(error.to_string(), "Plugin \"auth\" failed: X failed");
        assert_eq!(error.code(), "PLUGIN_ERROR");
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("X failed".to_string())
        );
    }

    #[test]
    fn custom_errors_report_their_own_code() {
        let error = SchmockError::custom("RATE_LIMITED", "slow down");

        assert_eq!(
            error.to_body(),
            json!({"error": "slow down", "code": "RATE_LIMITED"})
        );
    }

    #[test]
    fn route_not_found_message() {
        let error = SchmockError::RouteNotFound {
            method: "GET".into(),
            path: "/anything".into(),
        };

        assert_eq!(
            error.to_body(),
            json!({"error": "Route not found: GET /anything", "code": "ROUTE_NOT_FOUND"})
        );
    }
}
