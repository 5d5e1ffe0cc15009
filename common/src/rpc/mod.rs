mod error;

pub use error::RpcError;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

pub const JSON_RPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub id: Id,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        JsonRpcRequest {
            jsonrpc: Cow::Borrowed(JSON_RPC_VERSION),
            id: Id::Number(id),
            method: method.to_owned(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: i16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl JsonRpcResponse {
    // Collapse the response envelope into the usual Result shape
    pub fn into_result(self) -> Result<Value, RpcError> {
        if self.jsonrpc != JSON_RPC_VERSION {
            return Err(RpcError::InvalidVersion);
        }
        if let Some(error) = self.error {
            return Err(RpcError::Server {
                code: error.code,
                message: error.message,
            });
        }
        self.result.ok_or(RpcError::InvalidResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(1, "simulate_call", None);
        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"simulate_call\""));
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_response_result() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"sequence":4}}"#)
                .expect("deserialization should succeed");
        let value = response.into_result().expect("result expected");
        assert_eq!(value["sequence"], 4);
    }

    #[test]
    fn test_response_error() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-5,"message":"record not found"}}"#,
        )
        .expect("deserialization should succeed");
        match response.into_result() {
            Err(RpcError::Server { code, message }) => {
                assert_eq!(code, -5);
                assert_eq!(message, "record not found");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_version_rejected() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"1.0","id":1,"result":true}"#)
                .expect("deserialization should succeed");
        assert!(matches!(
            response.into_result(),
            Err(RpcError::InvalidVersion)
        ));
    }
}
