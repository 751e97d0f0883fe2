//! Request and response wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AgentError;

/// Protocol version accepted in the `jsonrpc` envelope field.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Error code for lines that fail JSON parsing or envelope validation.
pub const CODE_PARSE_ERROR: i64 = -32700;

/// Error code for every failure past envelope validation: unknown methods,
/// invalid params, guard rejections, and handler errors.
pub const CODE_REQUEST_FAILED: i64 = -32000;

/// Placeholder response id when the request id itself could not be parsed.
pub const UNKNOWN_ID: &str = "unknown";

/// Inbound request envelope.
///
/// `id` stays a raw [`Value`] so string and numeric ids are echoed back
/// byte-faithfully.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// Protocol version; must equal [`PROTOCOL_VERSION`].
    pub jsonrpc: String,
    /// Correlation id: a non-empty string or a number.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Method parameters; `Null` when absent.
    #[serde(default)]
    pub params: Value,
}

/// A request line that could not be turned into an envelope, with the
/// best-effort id to answer under.
#[derive(Debug)]
pub struct ParseFailure {
    /// Id extracted from the raw line when possible, else `"unknown"`.
    pub id: Value,
    /// What was wrong with the line.
    pub error: AgentError,
}

/// Parse and validate one request line.
///
/// # Errors
///
/// Returns [`ParseFailure`] when the line is not JSON, the envelope is
/// missing fields, the protocol version is unsupported, or the id is not a
/// non-empty string or number.
pub fn parse_request(line: &str) -> std::result::Result<RequestEnvelope, ParseFailure> {
    let value: Value = serde_json::from_str(line).map_err(|err| ParseFailure {
        id: Value::String(UNKNOWN_ID.into()),
        error: AgentError::Protocol(format!("invalid JSON: {err}")),
    })?;

    let fallback_id = value
        .get("id")
        .filter(|id| is_valid_id(id))
        .cloned()
        .unwrap_or_else(|| Value::String(UNKNOWN_ID.into()));

    let envelope: RequestEnvelope = serde_json::from_value(value).map_err(|err| ParseFailure {
        id: fallback_id.clone(),
        error: AgentError::Protocol(format!("invalid request envelope: {err}")),
    })?;

    if envelope.jsonrpc != PROTOCOL_VERSION {
        return Err(ParseFailure {
            id: fallback_id,
            error: AgentError::Protocol(format!(
                "unsupported protocol version: {}",
                envelope.jsonrpc
            )),
        });
    }

    if !is_valid_id(&envelope.id) {
        return Err(ParseFailure {
            id: fallback_id,
            error: AgentError::Protocol("request id must be a non-empty string or number".into()),
        });
    }

    if envelope.method.is_empty() {
        return Err(ParseFailure {
            id: envelope.id,
            error: AgentError::Protocol("request method must not be empty".into()),
        });
    }

    Ok(envelope)
}

fn is_valid_id(id: &Value) -> bool {
    match id {
        Value::String(text) => !text.is_empty(),
        Value::Number(_) => true,
        _ => false,
    }
}

/// Wire error object carried inside an error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorObject {
    /// [`CODE_PARSE_ERROR`] or [`CODE_REQUEST_FAILED`].
    pub code: i64,
    /// Human-readable failure message.
    pub message: String,
    /// Structured detail; carries at least the failure `kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outbound response: exactly one per request, success or error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Always [`PROTOCOL_VERSION`].
    pub jsonrpc: String,
    /// Echo of the request id.
    pub id: Value,
    /// Success payload; absent on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// Build a success response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response under `code` from a domain error.
    ///
    /// The wire message is the error's bare [`message`](AgentError::message)
    /// form; `data` carries the failure kind plus any structured detail.
    #[must_use]
    pub fn failure(id: Value, code: i64, error: &AgentError) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION.into(),
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message: error.message(),
                data: Some(error.data()),
            }),
        }
    }
}
