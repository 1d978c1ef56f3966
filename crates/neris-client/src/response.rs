//! Request bodies and classified responses.

use serde_json::Value;

use crate::errors::ClientError;

/// A response body: parsed JSON when possible, else raw text.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Body parsed as JSON.
    Json(Value),
    /// Body that is not JSON (may be empty).
    Text(String),
}

impl Payload {
    /// Parse `text` as JSON, falling back to the raw text.
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }

    /// The JSON value, if the body parsed.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Convert to a JSON value, wrapping text as a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// A non-2xx response from the API.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestFailure {
    /// HTTP status code.
    pub status: u16,
    /// Error body.
    pub payload: Payload,
}

/// Classified result of a gateway call.
#[derive(Clone, Debug, PartialEq)]
pub enum CallOutcome {
    /// 2xx response.
    Success(Payload),
    /// Any other status.
    Failure(RequestFailure),
}

impl CallOutcome {
    /// Whether the call got a 2xx response.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, whichever way the call went.
    pub fn payload(&self) -> &Payload {
        match self {
            Self::Success(payload) | Self::Failure(RequestFailure { payload, .. }) => payload,
        }
    }

    /// `Ok` with the success payload, `Err` with the failure.
    pub fn into_result(self) -> Result<Payload, RequestFailure> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Failure(failure) => Err(failure),
        }
    }
}

/// A request body given either as a JSON value or as JSON text.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Structured body.
    Json(Value),
    /// Body given as a JSON document string.
    Text(String),
}

impl RequestBody {
    /// The body as a JSON value, parsing text bodies.
    pub fn into_value(self) -> Result<Value, ClientError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => serde_json::from_str(&text)
                .map_err(|e| ClientError::InvalidBody(format!("not JSON: {e}"))),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
