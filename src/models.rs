//! Wire payloads exchanged with the SSO broker
//!
//! Every response is wrapped in a `{ "data": ... }` envelope. Fields the
//! controller does not interpret are preserved in `extra` so that events carry
//! the full payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle status of an SSO session
///
/// `Expired` is never sent by the server; it is inferred when a status query
/// yields no data. Unrecognised server values are kept as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionStatus {
    Created,
    Processing,
    Success,
    Failed,
    Expired,
    Unknown(String),
}

impl SessionStatus {
    /// `success` and `failed` end polling permanently
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for SessionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "created" => Self::Created,
            "processing" => Self::Processing,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "expired" => Self::Expired,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<SessionStatus> for String {
    fn from(status: SessionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ "data": T }` response envelope
#[derive(Debug, Clone, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Payload of a successful session registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRegistration {
    /// Opaque session id assigned by the broker
    pub session: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionRegistration {
    /// Extract the registration from a raw response body
    ///
    /// Returns `None` when the body has no `data.session` string.
    #[must_use]
    pub fn from_response(body: &Value) -> Option<Self> {
        Envelope::<Self>::deserialize(body).ok().map(|e| e.data)
    }
}

/// Status payload returned when querying a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTicket {
    /// Missing or non-string values decode as [`SessionStatus::Unknown`]
    #[serde(default = "missing_status", deserialize_with = "lenient_status")]
    pub status: SessionStatus,
    /// Service-defined data attached once the handshake completes
    #[serde(rename = "customData", default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn missing_status() -> SessionStatus {
    SessionStatus::Unknown(String::new())
}

fn lenient_status<'de, D>(deserializer: D) -> Result<SessionStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => SessionStatus::from(raw),
        other => SessionStatus::Unknown(other.to_string()),
    })
}

impl StatusTicket {
    /// Extract the ticket from a raw response body
    ///
    /// Returns `None` only when the body has no `data` object.
    #[must_use]
    pub fn from_response(body: &Value) -> Option<Self> {
        Envelope::<Self>::deserialize(body).ok().map(|e| e.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        assert_eq!(SessionStatus::from("processing".to_string()), SessionStatus::Processing);
        assert_eq!(
            SessionStatus::from("pending_review".to_string()),
            SessionStatus::Unknown("pending_review".to_string())
        );
        assert!(SessionStatus::Success.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Processing.is_terminal());
        assert!(!SessionStatus::Expired.is_terminal());
    }

    #[test]
    fn test_registration_from_response() {
        let body = json!({ "data": { "session": "abc-123", "expiresIn": 60 } });
        let registration = SessionRegistration::from_response(&body).unwrap();
        assert_eq!(registration.session, "abc-123");
        assert_eq!(registration.extra.get("expiresIn"), Some(&json!(60)));

        assert!(SessionRegistration::from_response(&json!({ "data": {} })).is_none());
        assert!(SessionRegistration::from_response(&json!({ "session": "x" })).is_none());
    }

    #[test]
    fn test_ticket_from_response() {
        let body = json!({
            "data": {
                "status": "success",
                "customData": { "sessionData": "abc-123", "extraData": { "k": "v" } }
            }
        });
        let ticket = StatusTicket::from_response(&body).unwrap();
        assert_eq!(ticket.status, SessionStatus::Success);
        assert_eq!(ticket.custom_data.unwrap()["sessionData"], "abc-123");

        assert!(StatusTicket::from_response(&json!({ "data": "oops" })).is_none());
        assert!(StatusTicket::from_response(&json!({ "status": "success" })).is_none());
        assert!(StatusTicket::from_response(&json!(null)).is_none());
    }

    #[test]
    fn test_ticket_with_odd_status_is_unknown() {
        let ticket = StatusTicket::from_response(&json!({ "data": { "status": null } })).unwrap();
        assert_eq!(ticket.status, SessionStatus::Unknown("null".to_string()));

        let ticket = StatusTicket::from_response(&json!({ "data": { "status": 3 } })).unwrap();
        assert_eq!(ticket.status, SessionStatus::Unknown("3".to_string()));

        let ticket = StatusTicket::from_response(&json!({ "data": { "code": 404 } })).unwrap();
        assert_eq!(ticket.status, SessionStatus::Unknown(String::new()));
        assert_eq!(ticket.extra.get("code"), Some(&json!(404)));
    }

    #[test]
    fn test_ticket_serializes_wire_names() {
        let ticket = StatusTicket {
            status: SessionStatus::Processing,
            custom_data: None,
            extra: Map::new(),
        };
        assert_eq!(serde_json::to_value(&ticket).unwrap(), json!({ "status": "processing" }));
    }
}
