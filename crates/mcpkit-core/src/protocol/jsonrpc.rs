use crate::protocol::constants::{JSONRPC_VERSION, MAX_SAFE_REQUEST_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    /// Parse error (invalid JSON)
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request (malformed frame)
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid parameters
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Framework-specific error codes in the implementation-defined range
pub mod mcp_error_codes {
    /// Operational request while the server is initializing
    pub const LIFECYCLE_VIOLATION: i32 = -32000;
    /// Stream operation (middleware deadline) timed out
    pub const STREAM_TIMEOUT: i32 = -32001;
    /// Operational request before the handshake started
    pub const NOT_INITIALIZED: i32 = -32002;
    /// Request after the server shut down
    pub const AFTER_SHUTDOWN: i32 = -32003;
    /// Middleware-imposed rate limit
    pub const RATE_LIMIT: i32 = -32004;
}

/// JSON-RPC 2.0 request id.
///
/// `Null` is a real correlation token on the wire (`"id": null`); it is not
/// the same thing as an absent id, which makes the frame a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String-based request ID
    String(String),
    /// Number-based request ID
    Number(i64),
    /// Explicit `null` correlation token
    Null,
}

impl RequestId {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn number(n: i64) -> Self {
        Self::Number(n)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }

    /// Validate the request id against the wire constraints.
    pub fn validate(&self) -> Result<(), crate::error::ProtocolError> {
        if let RequestId::Number(n) = self {
            if n.abs() > MAX_SAFE_REQUEST_ID {
                return Err(crate::error::ProtocolError::InvalidRequest(format!(
                    "Request id {n} exceeds the safe integer range"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

/// JSON-RPC 2.0 request. Always carries an id (possibly `null`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub jsonrpc: Cow<'static, str>,
    /// The name of the method to be invoked
    pub method: String,
    /// Optional parameters for the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Correlation token, echoed verbatim in the response
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 notification: a request frame without any `id` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    #[serde(rename = "jsonrpc")]
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response carrying either a result or an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(error: JsonRpcError, id: RequestId) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: Option<String>) -> Self {
        let msg = message.unwrap_or_else(|| "Parse error".to_string());
        Self::new(error_codes::PARSE_ERROR, msg)
    }

    pub fn invalid_request(message: Option<String>) -> Self {
        let msg = message.unwrap_or_else(|| "Invalid request".to_string());
        Self::new(error_codes::INVALID_REQUEST, msg)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    pub fn invalid_params(message: Option<String>) -> Self {
        let msg = message.unwrap_or_else(|| "Invalid parameters".to_string());
        Self::new(error_codes::INVALID_PARAMS, msg)
    }

    pub fn internal_error(message: Option<String>) -> Self {
        let msg = message.unwrap_or_else(|| "Internal error".to_string());
        Self::new(error_codes::INTERNAL_ERROR, msg)
    }
}

/// Any inbound JSON-RPC frame the server processes.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.method),
            JsonRpcMessage::Notification(n) => Some(&n.method),
            JsonRpcMessage::Response(_) => None,
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.id),
            JsonRpcMessage::Notification(_) => None,
            JsonRpcMessage::Response(resp) => Some(&resp.id),
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcMessage::Notification(_))
    }
}

impl Serialize for JsonRpcMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            JsonRpcMessage::Request(req) => req.serialize(serializer),
            JsonRpcMessage::Notification(n) => n.serialize(serializer),
            JsonRpcMessage::Response(resp) => resp.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_keeps_null_id() {
        let request = JsonRpcRequest::new("test_method", Some(json!({"param": "value"})), RequestId::Null);
        let serialized = serde_json::to_value(&request).expect("Failed to serialize request");
        assert_eq!(serialized["id"], Value::Null);

        let request = JsonRpcRequest::new("test_method", None, RequestId::number(7));
        let serialized = serde_json::to_value(&request).expect("Failed to serialize request");
        assert_eq!(serialized["id"], json!(7));
        assert!(serialized.get("params").is_none());
    }

    #[test]
    fn test_notification_has_no_id_field() {
        let notification = JsonRpcNotification::new("notifications/progress", Some(json!({"p": 1})));
        let serialized = serde_json::to_value(&notification).unwrap();
        assert!(serialized.get("id").is_none());
    }

    #[test]
    fn test_response_success() {
        let response = JsonRpcResponse::success(json!({"ok": true}), RequestId::string("a"));
        assert!(response.result.is_some());
        assert!(response.error.is_none());
        assert_eq!(response.id, RequestId::string("a"));
    }

    #[test]
    fn test_response_error_omits_absent_data() {
        let error = JsonRpcError::method_not_found("unknown");
        let response = JsonRpcResponse::error(error, RequestId::number(1));
        let serialized = serde_json::to_value(&response).unwrap();
        assert!(serialized["error"].get("data").is_none());
        assert!(serialized.get("result").is_none());
    }

    #[test]
    fn test_request_id_validation() {
        assert!(RequestId::string("valid_id").validate().is_ok());
        assert!(RequestId::number(123).validate().is_ok());
        assert!(RequestId::Null.validate().is_ok());
        assert!(RequestId::number(1 << 54).validate().is_err());
    }

    #[test]
    fn test_request_id_untagged_roundtrip() {
        let id: RequestId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, RequestId::string("abc"));
        let id: RequestId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id, RequestId::number(42));
        let id: RequestId = serde_json::from_value(Value::Null).unwrap();
        assert!(id.is_null());
        assert_eq!(serde_json::to_value(RequestId::Null).unwrap(), Value::Null);
    }
}
