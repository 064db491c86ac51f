use crate::request::RequestContext;
use crate::Response;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A request handled by a mock, together with the response it got.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    /// The key of the matched route, `None` if nothing matched.
    pub route: Option<String>,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub response: Response,
}

impl RecordedCall {
    pub(crate) fn new(request: RequestContext, response: Response) -> Self {
        Self {
            route: request.route.as_ref().map(|route| route.key().to_string()),
            method: request.method,
            path: request.path,
            params: request.params,
            query: request.query,
            headers: request.headers,
            body: request.body,
            response,
        }
    }
}

impl fmt::Display for RecordedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.method,
            self.path,
            self.response.status.as_u16()
        )
    }
}

/// Every call handled by a mock instance, in the order the calls completed.
#[derive(Debug, Default)]
pub(crate) struct CallHistory {
    calls: Mutex<Vec<RecordedCall>>,
}

impl CallHistory {
    pub(crate) fn record(&self, call: RecordedCall) {
        self.lock().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        self.lock()
            .iter()
            .filter(|call| &call.method == method && call.path == path)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
