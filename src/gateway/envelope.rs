//! Wire-format types: inbound frames and the uniform outbound envelope.

use serde::Serialize;
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names understood by the session handlers, plus the publication
/// types used on broadcast groups.
pub struct EventName;

impl EventName {
    pub const GROUP_CREATE: &'static str = "group.create";
    pub const GROUP_LIST: &'static str = "group.list";
    pub const GROUP_DELETE: &'static str = "group.delete";
    pub const USER_LIST: &'static str = "user.list";
    pub const EVENT_LIST: &'static str = "event.list";

    pub const SEND_MESSAGE: &'static str = "send.message";
    pub const LIST_MESSAGE: &'static str = "list.message";
    pub const ADD_PARTICIPANTS: &'static str = "add.participants";
    pub const DELETE_PARTICIPANT: &'static str = "delete.participant";

    /// Publication type for in-room broadcasts.
    pub const CHAT_MESSAGE: &'static str = "chat.message";
    /// Publication type for personal-group notifications.
    pub const SEND_NOTIFICATION: &'static str = "send.notification";
}

// ---------------------------------------------------------------------------
// Outbound envelope
// ---------------------------------------------------------------------------

/// The uniform outbound structure, both for replies and relayed broadcasts.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: &'static str,
    pub event: Option<String>,
    pub message: Value,
}

impl Envelope {
    pub fn ok(event: Option<String>, message: Value) -> Self {
        Self {
            status: "ok",
            event,
            message,
        }
    }

    pub fn error(event: Option<String>, message: Value) -> Self {
        Self {
            status: "error",
            event,
            message,
        }
    }

    /// Error reply for frames that do not decode to `{event, data}`.
    pub fn invalid_input() -> Self {
        Self::error(
            None,
            json!({
                "detail": "Invalid input",
                "valid_input_example": {
                    "event": "event.example",
                    "data": { "var": "val" }
                }
            }),
        )
    }
}

// ---------------------------------------------------------------------------
// Inbound frame
// ---------------------------------------------------------------------------

/// A well-formed inbound frame: a string `event` and an object `data`.
#[derive(Debug)]
pub struct Frame {
    pub event: String,
    pub data: Map<String, Value>,
}

impl Frame {
    /// Parse and validate an inbound text frame. Returns `None` for
    /// anything that is not an object with a string `event` and an object
    /// `data` — the caller replies with `Envelope::invalid_input`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let event = value.get("event")?.as_str()?.to_string();
        let data = value.get("data")?.as_object()?.clone();
        Some(Self { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_frame() {
        let frame = Frame::parse(r#"{"event": "group.list", "data": {}}"#).unwrap();
        assert_eq!(frame.event, "group.list");
        assert!(frame.data.is_empty());
    }

    #[test]
    fn rejects_malformed_frames() {
        for text in [
            "not json",
            "[1, 2]",
            r#"{"event": "x"}"#,
            r#"{"data": {}}"#,
            r#"{"event": 5, "data": {}}"#,
            r#"{"event": "x", "data": []}"#,
            r#"{"event": "x", "data": "y"}"#,
        ] {
            assert!(Frame::parse(text).is_none(), "accepted: {text}");
        }
    }

    #[test]
    fn envelope_serializes_null_event() {
        let value = serde_json::to_value(Envelope::ok(None, json!({"a": 1}))).unwrap();
        assert_eq!(value["status"], "ok");
        assert!(value["event"].is_null());
        assert_eq!(value["message"]["a"], 1);
    }

    #[test]
    fn invalid_input_includes_usage_example() {
        let value = serde_json::to_value(Envelope::invalid_input()).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"]["detail"], "Invalid input");
        assert_eq!(
            value["message"]["valid_input_example"]["event"],
            "event.example"
        );
    }
}
