//! Invocation envelope exchanged with the protocol layer

use apidispatch_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to invoke one operation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub operation_id: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl InvokeRequest {
    pub fn new(operation_id: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            operation_id: operation_id.into(),
            parameters,
        }
    }
}

/// Error body returned to the caller
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    /// Backend diagnostic detail (status, response body, error chain)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Outcome of an invocation: the backend payload or `{ "message", "trace"? }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InvokeResponse {
    Error(ErrorPayload),
    Success(Value),
}

impl InvokeResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, InvokeResponse::Error(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            InvokeResponse::Success(value) => value,
            InvokeResponse::Error(ErrorPayload { message, trace }) => match trace {
                Some(trace) => serde_json::json!({ "message": message, "trace": trace }),
                None => serde_json::json!({ "message": message }),
            },
        }
    }
}

impl From<Result<Value>> for InvokeResponse {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(value) => InvokeResponse::Success(value),
            Err(e) => InvokeResponse::Error(ErrorPayload {
                message: e.to_string(),
                trace: e.trace().map(str::to_string),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidispatch_common::DispatchError;
    use serde_json::json;

    #[test]
    fn test_request_defaults_parameters() {
        let request: InvokeRequest =
            serde_json::from_value(json!({ "operationId": "GetBalance" })).unwrap();
        assert_eq!(request.operation_id, "GetBalance");
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_response_serialization() {
        let ok = InvokeResponse::from(Ok(json!({ "object": "balance" })));
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({ "object": "balance" }));

        let err = InvokeResponse::from(Err(DispatchError::OperationNotFound(
            "GetNothing".to_string(),
        )));
        assert!(err.is_error());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "message": "Operation not found: GetNothing" })
        );
    }

    #[test]
    fn test_backend_trace_is_kept() {
        let err = InvokeResponse::from(Err(DispatchError::backend(
            "GET /v1/balance returned 500",
            Some("status 500: upstream timeout".to_string()),
        )));
        let expected = json!({
            "message": "Backend invocation failed: GET /v1/balance returned 500",
            "trace": "status 500: upstream timeout"
        });
        assert_eq!(serde_json::to_value(&err).unwrap(), expected);

        let parsed: InvokeResponse = serde_json::from_value(expected.clone()).unwrap();
        assert!(parsed.is_error());
        assert_eq!(parsed.into_value(), expected);
    }
}
