use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier of a JSON-RPC request.
///
/// `AutoIncrement` is a placeholder: the connection replaces it with its next
/// integer id at send time. Only `Int` ids can be correlated with replies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RequestId {
    #[default]
    Unset,
    Int(i64),
    Str(String),
    AutoIncrement,
}

impl RequestId {
    pub fn is_set(&self) -> bool {
        !matches!(self, RequestId::Unset)
    }

    fn is_unset(&self) -> bool {
        !self.is_set()
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RequestId::Int(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Unset => write!(f, "<unset>"),
            RequestId::Int(id) => write!(f, "{}", id),
            RequestId::Str(id) => write!(f, "{:?}", id),
            RequestId::AutoIncrement => write!(f, "<auto>"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Int(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::Str(id.to_string())
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RequestId::Int(id) => serializer.serialize_i64(*id),
            RequestId::Str(id) => serializer.serialize_str(id),
            RequestId::Unset | RequestId::AutoIncrement => serializer.serialize_none(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(i64),
    Str(String),
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<WireId>::deserialize(deserializer)? {
            Some(WireId::Int(id)) => RequestId::Int(id),
            Some(WireId::Str(id)) => RequestId::Str(id),
            None => RequestId::Unset,
        })
    }
}

/// A request, or a notification when `id` is unset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestMessage {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "RequestId::is_unset")]
    pub id: RequestId,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl RequestMessage {
    pub fn new(id: RequestId, method: &str, params: serde_json::Value) -> Self {
        RequestMessage {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Request with unset id and method, both filled in at send time.
    pub fn with_params(params: serde_json::Value) -> Self {
        Self::new(RequestId::Unset, "", params)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResponseError {
    pub const METHOD_NOT_FOUND: i64 = -32601;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        ResponseError {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponseMessage {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ResponseMessage {
    pub fn from_result(result: serde_json::Value) -> Self {
        ResponseMessage {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Unset,
            result: Some(result),
            error: None,
        }
    }

    pub fn from_error(error: ResponseError) -> Self {
        ResponseMessage {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Unset,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(RequestMessage),
    Notification(RequestMessage),
    Response(ResponseMessage),
}
