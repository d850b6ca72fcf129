//! JSON-RPC 2.0 frame codec.
//!
//! Decoding accepts either raw text or an already-parsed value and validates
//! in a fixed order so that every malformed input maps to exactly one error
//! kind: parse failure, non-object frame, version mismatch, bad method, bad
//! id. Encoding builders guarantee that absent fields never appear on the
//! wire and that ids are echoed verbatim, including `null`.

use crate::protocol::constants::JSONRPC_VERSION;
use crate::protocol::jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use serde_json::Value;
use std::borrow::Cow;

/// Maximum number of input characters echoed back in parse error data.
const PARSE_ERROR_SNIPPET_LEN: usize = 120;

/// A decode failure paired with whatever id could be salvaged from the input.
///
/// When the frame was unparseable or the id itself was malformed, `id` is
/// `None` and the error response must go out with `id: null`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    pub error: JsonRpcError,
    pub id: Option<RequestId>,
}

impl DecodeError {
    fn new(error: JsonRpcError) -> Self {
        Self { error, id: None }
    }

    fn with_id(error: JsonRpcError, id: Option<RequestId>) -> Self {
        Self { error, id }
    }

    /// The id to echo on the wire: salvaged when possible, `null` otherwise.
    pub fn response_id(&self) -> RequestId {
        self.id.clone().unwrap_or(RequestId::Null)
    }

    /// Build the error response this decode failure maps to.
    pub fn into_response(self) -> JsonRpcResponse {
        let id = self.response_id();
        JsonRpcResponse::error(self.error, id)
    }
}

/// Raw transport input: a text line or a value a transport already parsed.
#[derive(Debug, Clone)]
pub enum Inbound {
    Text(String),
    Parsed(Value),
}

impl From<&str> for Inbound {
    fn from(s: &str) -> Self {
        Inbound::Text(s.to_string())
    }
}

impl From<String> for Inbound {
    fn from(s: String) -> Self {
        Inbound::Text(s)
    }
}

impl From<Value> for Inbound {
    fn from(v: Value) -> Self {
        Inbound::Parsed(v)
    }
}

/// Decode any inbound frame: request when an `id` key is present (even
/// `null`), notification otherwise.
pub fn decode_message(input: Inbound) -> Result<JsonRpcMessage, DecodeError> {
    let value = parse_input(input)?;
    let obj = require_frame(&value)?;
    if obj.contains_key("id") {
        decode_request_fields(&value).map(JsonRpcMessage::Request)
    } else {
        decode_notification_fields(&value).map(JsonRpcMessage::Notification)
    }
}

/// Decode an inbound frame that must be a request (an `id` field is required).
pub fn decode_request(input: Inbound) -> Result<JsonRpcRequest, DecodeError> {
    let value = parse_input(input)?;
    let obj = require_frame(&value)?;
    if !obj.contains_key("id") {
        return Err(DecodeError::new(JsonRpcError::invalid_request(Some(
            "Request is missing an id field".to_string(),
        ))));
    }
    decode_request_fields(&value)
}

/// Decode an inbound frame that must be a notification (no `id` permitted).
pub fn decode_notification(input: Inbound) -> Result<JsonRpcNotification, DecodeError> {
    let value = parse_input(input)?;
    require_frame(&value)?;
    decode_notification_fields(&value)
}

fn parse_input(input: Inbound) -> Result<Value, DecodeError> {
    match input {
        Inbound::Parsed(value) => Ok(value),
        Inbound::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(DecodeError::new(
                    JsonRpcError::parse_error(None)
                        .with_data(serde_json::json!({"input": ""})),
                ));
            }
            serde_json::from_str(trimmed).map_err(|_| {
                let snippet: String = trimmed.chars().take(PARSE_ERROR_SNIPPET_LEN).collect();
                DecodeError::new(
                    JsonRpcError::parse_error(None)
                        .with_data(serde_json::json!({"input": snippet})),
                )
            })
        }
    }
}

fn require_frame(value: &Value) -> Result<&serde_json::Map<String, Value>, DecodeError> {
    match value.as_object() {
        Some(obj) => Ok(obj),
        None => Err(DecodeError::new(JsonRpcError::invalid_request(Some(
            "Message must be a JSON object".to_string(),
        )))),
    }
}

/// Salvage a well-formed id from a possibly-malformed frame so the error
/// response can echo it. Malformed ids yield `None` (respond with `null`).
fn salvage_id(obj: &serde_json::Map<String, Value>) -> Option<RequestId> {
    match obj.get("id") {
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(Value::Number(n)) => n.as_i64().map(RequestId::Number),
        Some(Value::Null) => Some(RequestId::Null),
        _ => None,
    }
}

fn validate_common(
    obj: &serde_json::Map<String, Value>,
    salvaged: Option<RequestId>,
) -> Result<String, DecodeError> {
    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(_) | None => {
            return Err(DecodeError::with_id(
                JsonRpcError::invalid_request(Some(format!(
                    "jsonrpc field must be \"{JSONRPC_VERSION}\""
                ))),
                salvaged,
            ));
        }
    }

    match obj.get("method") {
        Some(Value::String(m)) if !m.is_empty() => Ok(m.clone()),
        Some(Value::String(_)) => Err(DecodeError::with_id(
            JsonRpcError::invalid_request(Some("Method name cannot be empty".to_string())),
            salvaged,
        )),
        Some(_) => Err(DecodeError::with_id(
            JsonRpcError::invalid_request(Some("Method must be a string".to_string())),
            salvaged,
        )),
        None => Err(DecodeError::with_id(
            JsonRpcError::invalid_request(Some("Method field is required".to_string())),
            salvaged,
        )),
    }
}

fn decode_request_fields(value: &Value) -> Result<JsonRpcRequest, DecodeError> {
    let obj = value.as_object().expect("caller validated the frame shape");
    let salvaged = salvage_id(obj);
    let method = validate_common(obj, salvaged.clone())?;

    let id = match obj.get("id") {
        Some(Value::String(s)) => RequestId::String(s.clone()),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => RequestId::Number(i),
            None => {
                return Err(DecodeError::new(JsonRpcError::invalid_request(Some(
                    "Request id must be an integer within the safe range".to_string(),
                ))));
            }
        },
        Some(Value::Null) => RequestId::Null,
        Some(_) => {
            return Err(DecodeError::new(JsonRpcError::invalid_request(Some(
                "Request id must be a string, number, or null".to_string(),
            ))));
        }
        None => RequestId::Null,
    };
    if id.validate().is_err() {
        return Err(DecodeError::new(JsonRpcError::invalid_request(Some(
            "Request id exceeds the safe integer range".to_string(),
        ))));
    }

    Ok(JsonRpcRequest {
        jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
        method,
        params: obj.get("params").cloned(),
        id,
    })
}

fn decode_notification_fields(value: &Value) -> Result<JsonRpcNotification, DecodeError> {
    let obj = value.as_object().expect("caller validated the frame shape");
    let salvaged = salvage_id(obj);
    let method = validate_common(obj, salvaged.clone())?;

    if obj.contains_key("id") {
        return Err(DecodeError::with_id(
            JsonRpcError::invalid_request(Some("Notification cannot carry an id".to_string())),
            salvaged,
        ));
    }

    Ok(JsonRpcNotification {
        jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
        method,
        params: obj.get("params").cloned(),
    })
}

/// Build a success response; `result` may legitimately be `null`.
pub fn success_response(result: Value, id: RequestId) -> JsonRpcResponse {
    JsonRpcResponse::success(result, id)
}

/// Build an error response echoing the given id.
pub fn error_response(error: JsonRpcError, id: RequestId) -> JsonRpcResponse {
    JsonRpcResponse::error(error, id)
}

/// Serialize any outbound message to its single-line wire form.
pub fn encode(message: &JsonRpcMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
