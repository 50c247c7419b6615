//! Request and response bodies of the HTTP API

use keybucket::Decision;
use serde::{Deserialize, Serialize};

/// Body of `POST /consume`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeRequest {
    /// The key to rate limit (e.g., "user:123", "ip:192.168.1.1")
    pub key: String,
    /// Number of tokens to take (optional, defaults to 1)
    pub quantity: Option<u64>,
}

/// Rate limit decision returned to clients
///
/// # Example
///
/// ```json
/// {
///   "allowed": false,
///   "limit": 10,
///   "remaining": 0,
///   "retry_after_ms": 250,
///   "reset_after_ms": 9250
/// }
/// ```
///
/// This response indicates the request was denied, no tokens remain, the
/// next token arrives in 250ms and the bucket is full again in 9.25s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResponse {
    /// Whether the tokens were taken
    pub allowed: bool,
    /// Bucket capacity
    pub limit: u64,
    /// Tokens remaining in the bucket
    pub remaining: u64,
    /// Milliseconds until the same request can succeed (0 if allowed)
    pub retry_after_ms: u64,
    /// Milliseconds until the bucket is full again
    pub reset_after_ms: u64,
}

impl From<Decision> for ConsumeResponse {
    fn from(decision: Decision) -> Self {
        ConsumeResponse {
            allowed: decision.allowed,
            limit: decision.limit,
            remaining: decision.remaining,
            retry_after_ms: decision.retry_after.as_millis() as u64,
            reset_after_ms: decision.reset_after.as_millis() as u64,
        }
    }
}

/// Error body for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_quantity_is_optional() {
        let request: ConsumeRequest = serde_json::from_str(r#"{"key": "test"}"#).unwrap();
        assert_eq!(request.key, "test");
        assert_eq!(request.quantity, None);
    }

    #[test]
    fn test_response_from_decision() {
        let response = ConsumeResponse::from(Decision {
            allowed: false,
            limit: 10,
            remaining: 0,
            retry_after: Duration::from_millis(250),
            reset_after: Duration::from_millis(9250),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["limit"], 10);
        assert_eq!(json["retry_after_ms"], 250);
        assert_eq!(json["reset_after_ms"], 9250);
    }
}
