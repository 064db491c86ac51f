use crate::SchmockError;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

/// The normalized response every pipeline stage after generation works on, and what
/// [`Schmock::handle`] returns.
///
/// [`Schmock::handle`]: crate::Schmock::handle
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Value,
    pub headers: HashMap<String, String>,
}

impl Response {
    /// A response with `status`, a `null` body and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: Value::Null,
            headers: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The response reported for a request-time error nobody recovered from.
    pub(crate) fn from_error(status: StatusCode, error: &SchmockError) -> Self {
        Self::new(status).with_body(error.to_body())
    }

    /// Convert a generated payload into a response.
    ///
    /// A JSON array whose first element is a number is read as a `[status, body, headers?]`
    /// tuple; any other payload is the body of a `200` with no headers.
    pub fn from_payload(payload: Value) -> Result<Self, String> {
        let items = match payload {
            Value::Array(items) if items.first().is_some_and(Value::is_number) => items,
            payload => return Ok(Self::new(StatusCode::OK).with_body(payload)),
        };
        if items.len() > 3 {
            return Err(format!(
                "a tuple response has at most 3 elements, got {}",
                items.len()
            ));
        }

        let mut items = items.into_iter();
        let status = items.next().unwrap_or_default();
        let status = status_code(&status)?;
        let body = items.next().unwrap_or_default();
        let headers = match items.next() {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(headers)) => headers
                .into_iter()
                .map(|(name, value)| match value {
                    Value::String(value) => Ok((name, value)),
                    value => Err(format!(
                        "header \"{}\" must be a string, got {}",
                        name, value
                    )),
                })
                .collect::<Result<_, _>>()?,
            Some(headers) => {
                return Err(format!(
                    "tuple headers must be an object, got {}",
                    headers
                ))
            }
        };

        Ok(Self {
            status,
            body,
            headers,
        })
    }
}

/// Statuses outside `100..=599` are rejected, as are non-integers.
fn status_code(status: &Value) -> Result<StatusCode, String> {
    status
        .as_u64()
        .filter(|status| (100..=599).contains(status))
        .and_then(|status| u16::try_from(status).ok())
        .and_then(|status| StatusCode::from_u16(status).ok())
        .ok_or_else(|| format!("{} is not a valid HTTP status", status))
}
