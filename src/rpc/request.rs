//! JSON-RPC request decoding, validation and response formatting
//!
//! Every failure that originates in the payload is recorded on the [`Call`]
//! itself rather than returned as a Rust error, so callers always have a value
//! they can serialize back to the client.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::rpc::codes::{ErrorCode, JSON_RPC_VERSION, RESERVED_PREFIX};

/// Sent in place of a response that could not be encoded.
pub const INTERNAL_ERROR_RESPONSE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error."},"id":null}"#;

static METHOD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("method name pattern compiles")
});

pub fn is_valid_method_name(name: &str) -> bool {
    METHOD_NAME.is_match(name)
}

/// Result slot of a single call. Assigned once, by the parser, the validator or
/// the dispatcher, whichever fails first.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Outcome {
    #[default]
    Pending,
    Success(Value),
    Failure { code: i64, message: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    pub version: Option<String>,
    pub method: Option<String>,
    pub params: Vec<Value>,
    pub id: Option<Value>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Single(Call),
    Batch(Vec<Request>),
}

#[derive(Serialize)]
struct SuccessResponse<'a> {
    jsonrpc: &'static str,
    result: &'a Value,
    id: &'a Value,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    jsonrpc: &'static str,
    error: ErrorObject<'a>,
    id: &'a Value,
}

#[derive(Serialize)]
struct ErrorObject<'a> {
    code: i64,
    message: &'a str,
}

impl Request {
    /// Decodes a raw payload. Never fails: malformed input yields a single call
    /// that already carries its protocol error.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Single(Call::failed(ErrorCode::InvalidRequest, None));
        }

        let payload: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => return Self::Single(Call::failed(ErrorCode::ParseError, None)),
        };

        Self::from_value(payload)
    }

    /// Builds a request from decoded JSON. Array elements go through this same
    /// path, so a nested array becomes a nested batch.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) if items.is_empty() => {
                Self::Single(Call::failed(ErrorCode::InvalidRequest, None))
            }
            Value::Array(items) => Self::Batch(items.into_iter().map(Self::from_value).collect()),
            other => Self::Single(Call::from_value(other)),
        }
    }

    /// Like [`Request::parse`], for payloads that may not be valid UTF-8.
    /// Invalid sequences are replaced before decoding.
    pub fn from_slice(raw: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(raw))
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl Call {
    pub fn failed(code: ErrorCode, id: Option<Value>) -> Self {
        Self {
            version: Some(JSON_RPC_VERSION.to_string()),
            id,
            outcome: Outcome::Failure {
                code: code.code(),
                message: code.message().to_string(),
            },
            ..Self::default()
        }
    }

    /// Decodes one batch element or top-level object. Anything that is not an
    /// object with a string `method` is an invalid request; the `id` is echoed
    /// whenever it has a legal type.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut object) = value else {
            return Self::failed(ErrorCode::InvalidRequest, None);
        };

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(id @ (Value::String(_) | Value::Number(_))) => Some(id),
            Some(_) => return Self::failed(ErrorCode::InvalidRequest, None),
        };

        let version = match object.remove("jsonrpc") {
            None | Some(Value::Null) => None,
            Some(Value::String(version)) => Some(version),
            Some(_) => return Self::failed(ErrorCode::InvalidRequest, id),
        };

        let Some(Value::String(method)) = object.remove("method") else {
            return Self::failed(ErrorCode::InvalidRequest, id);
        };

        let params = match object.remove("params") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            // named parameters travel as a single mapping argument
            Some(named @ Value::Object(_)) => vec![named],
            Some(_) => return Self::failed(ErrorCode::InvalidRequest, id),
        };

        Self {
            version,
            method: Some(method),
            params,
            id,
            outcome: Outcome::Pending,
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self.id, None | Some(Value::Null))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failure { .. })
    }

    pub fn fail(&mut self, code: ErrorCode) {
        self.fail_with(code, code.message());
    }

    pub fn fail_with(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.outcome = Outcome::Failure {
            code: code.code(),
            message: message.into(),
        };
    }

    pub fn succeed(&mut self, result: Value) {
        self.outcome = Outcome::Success(result);
    }

    /// Checks protocol-level validity. Returns `false` without touching the
    /// outcome when an error is already recorded, so repeated calls agree.
    pub fn check_valid(&mut self) -> bool {
        if self.is_failed() {
            return false;
        }

        let failure = match (self.version.as_deref(), self.method.as_deref()) {
            (None, _) | (_, None) | (_, Some("")) => Some(ErrorCode::InvalidRequest),
            (Some(version), _) if version != JSON_RPC_VERSION => {
                Some(ErrorCode::MismatchedVersion)
            }
            (_, Some(method)) if method.starts_with(RESERVED_PREFIX) => {
                Some(ErrorCode::ReservedPrefix)
            }
            (_, Some(method)) if !is_valid_method_name(method) => {
                Some(ErrorCode::InvalidRequest)
            }
            _ => None,
        };

        match failure {
            Some(code) => {
                self.fail(code);
                false
            }
            None => true,
        }
    }

    /// Serializes the call as a response. Successful notifications produce
    /// nothing; failures are always reported, with `id` null when unknown.
    pub fn to_response_json(&self) -> Option<String> {
        let id = self.id.clone().unwrap_or(Value::Null);

        let encoded = match &self.outcome {
            Outcome::Failure { code, message } => serde_json::to_string(&ErrorResponse {
                jsonrpc: JSON_RPC_VERSION,
                error: ErrorObject {
                    code: *code,
                    message: message.as_str(),
                },
                id: &id,
            }),
            _ if self.is_notification() => return None,
            Outcome::Success(result) => serde_json::to_string(&SuccessResponse {
                jsonrpc: JSON_RPC_VERSION,
                result,
                id: &id,
            }),
            Outcome::Pending => serde_json::to_string(&SuccessResponse {
                jsonrpc: JSON_RPC_VERSION,
                result: &Value::Null,
                id: &id,
            }),
        };

        Some(encoded.unwrap_or_else(|err| {
            error!(error = %err, "failed to encode jsonrpc response");
            INTERNAL_ERROR_RESPONSE.to_string()
        }))
    }
}
