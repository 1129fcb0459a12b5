//! Cursor API message types.
//!
//! This module defines the JSON structures exchanged with the server's cursor
//! endpoints and the decoding of a raw reply into a [`BatchResponse`].

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Request body submitted to create a cursor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorRequest {
    /// AQL query text
    pub query: String,
    /// Bind parameter values
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub bind_vars: HashMap<String, Value>,
    /// Maximum number of documents per batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    /// Whether the query result cache may be used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
    /// Whether the total result count should be returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
    /// Idle time-to-live of the server cursor in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<f64>,
    /// Memory limit for the query in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
    /// Extra execution options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<CursorRequestOptions>,
}

impl CursorRequest {
    /// Create a request for the given query text.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bind_vars: HashMap::new(),
            batch_size: None,
            cache: None,
            count: None,
            ttl: None,
            memory_limit: None,
            options: None,
        }
    }
}

/// Nested `options` object of a cursor request.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_count: Option<bool>,
    /// Server-side execution limit in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_warning: Option<bool>,
}

impl CursorRequestOptions {
    /// True if no option is set, in which case the object is not sent.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Identifier of a server-side cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorId(String);

impl CursorId {
    /// Create a new cursor id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CursorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CursorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A warning raised by the server while running the query.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryWarning {
    pub code: i64,
    pub message: String,
}

/// Execution statistics reported with a batch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryStats {
    pub writes_executed: u64,
    pub writes_ignored: u64,
    pub scanned_full: u64,
    pub scanned_index: u64,
    pub filtered: u64,
    pub http_requests: u64,
    /// Result count ignoring the final LIMIT, when `fullCount` was requested
    pub full_count: Option<u64>,
    /// Execution time in seconds
    pub execution_time: Option<f64>,
    pub peak_memory_usage: Option<u64>,
}

/// Advisory diagnostics attached to a batch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CursorExtra {
    pub warnings: Vec<QueryWarning>,
    pub stats: Option<QueryStats>,
    pub profile: Option<Value>,
}

/// One decoded server reply: either the answer to a submission or to a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    /// Cursor id, absent when the whole result fit in this batch
    pub id: Option<CursorId>,
    /// Documents in server order
    pub documents: Vec<Value>,
    /// Whether more batches remain on the server
    pub has_more: bool,
    /// Total result count, if requested
    pub count: Option<u64>,
    /// Whether the result was served from the query cache
    pub cached: bool,
    /// Warnings and statistics
    pub extra: CursorExtra,
}

impl BatchResponse {
    /// Decode a raw server reply.
    ///
    /// Missing `id`, `count` and `extra` are tolerated. A missing or mistyped
    /// `result` array or `hasMore` flag is a [`TransportError::MalformedResponse`].
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        let mut body = match value {
            Value::Object(body) => body,
            other => {
                return Err(malformed(format!(
                    "expected a JSON object, got {}",
                    json_type(&other)
                )))
            }
        };

        let documents = match body.remove("result") {
            Some(Value::Array(documents)) => documents,
            Some(other) => {
                return Err(malformed(format!(
                    "'result' must be an array, got {}",
                    json_type(&other)
                )))
            }
            None => return Err(malformed("missing 'result' array")),
        };

        let has_more = match body.get("hasMore") {
            Some(Value::Bool(has_more)) => *has_more,
            Some(other) => {
                return Err(malformed(format!(
                    "'hasMore' must be a boolean, got {}",
                    json_type(other)
                )))
            }
            None => return Err(malformed("missing 'hasMore' flag")),
        };

        let id = decode_id(body.remove("id"))?;

        let count = match body.get("count") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                malformed(format!(
                    "'count' must be a non-negative integer, got {value}"
                ))
            })?),
        };

        let cached = body
            .get("cached")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let extra = decode_extra(&mut body);

        Ok(Self {
            id,
            documents,
            has_more,
            count,
            cached,
            extra,
        })
    }
}

fn decode_id(id: Option<Value>) -> Result<Option<CursorId>, TransportError> {
    match id {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(CursorId(id))),
        Some(Value::Number(id)) => Ok(Some(CursorId(id.to_string()))),
        Some(other) => Err(malformed(format!(
            "'id' must be a string, got {}",
            json_type(&other)
        ))),
    }
}

// `extra` is advisory: an undecodable payload is logged and dropped.
fn decode_extra(body: &mut Map<String, Value>) -> CursorExtra {
    match body.remove("extra") {
        None | Some(Value::Null) => CursorExtra::default(),
        Some(extra) => serde_json::from_value(extra).unwrap_or_else(|e| {
            tracing::warn!("ignoring undecodable cursor extra: {}", e);
            CursorExtra::default()
        }),
    }
}

fn malformed(message: impl Into<String>) -> TransportError {
    TransportError::MalformedResponse(message.into())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Error body returned by the server on failed requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: bool,
    pub code: u16,
    pub error_num: i64,
    pub error_message: String,
}
