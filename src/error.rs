use serde_json::{json, Value};
use thiserror::Error;

use crate::gateway::envelope::Envelope;
use crate::store::StoreError;

/// Protocol-level errors raised while handling a connection or an event.
///
/// `AuthenticationFailed` and `RouteNotFound` are terminal: the connection
/// is closed after the error is reported. Everything else converts into a
/// single outbound error envelope and the connection stays open.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Authorization failed")]
    AuthenticationFailed,

    #[error("Invalid route")]
    RouteNotFound,

    /// Referenced room/user/message is absent.
    #[error("{0}")]
    NotFound(&'static str),

    /// Authenticated caller lacks the permission for this action.
    #[error("You do not have permissions to perform this action")]
    AccessDenied,

    /// Malformed or out-of-range event payload. Carries the canonical
    /// example payload echoed back to the client.
    #[error("{detail}")]
    Validation {
        detail: &'static str,
        example: Value,
        event: Option<String>,
    },

    /// Event name not registered on this session.
    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChatError {
    /// Convert the error into the uniform outbound error envelope.
    pub fn into_envelope(self) -> Envelope {
        match self {
            ChatError::AuthenticationFailed => {
                Envelope::error(None, json!({ "detail": "Authorization failed" }))
            }
            ChatError::RouteNotFound => {
                Envelope::error(None, json!({ "detail": "Invalid route" }))
            }
            ChatError::NotFound(detail) => Envelope::error(None, json!({ "detail": detail })),
            ChatError::AccessDenied => Envelope::error(
                None,
                json!({ "detail": "You do not have permissions to perform this action" }),
            ),
            ChatError::Validation {
                detail,
                example,
                event,
            } => Envelope::error(
                event,
                json!({ "detail": detail, "valid_data_example": example }),
            ),
            ChatError::UnknownEvent(event) => Envelope::error(
                Some(event),
                json!({
                    "detail": "Invalid event. You can check available events send event \"event.list\""
                }),
            ),
            // Store lookup failures fold into a generic not-found reply.
            ChatError::Store(_) => Envelope::error(None, json!({ "detail": "Not found" })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_example_and_event() {
        let err = ChatError::Validation {
            detail: "Invalid data",
            example: json!({ "group": "GroupName" }),
            event: Some("group.delete".to_string()),
        };
        let env = err.into_envelope();
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["event"], "group.delete");
        assert_eq!(value["message"]["detail"], "Invalid data");
        assert_eq!(value["message"]["valid_data_example"]["group"], "GroupName");
    }

    #[test]
    fn unknown_event_names_the_offender() {
        let env = ChatError::UnknownEvent("group.rename".to_string()).into_envelope();
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["event"], "group.rename");
        assert!(value["message"]["detail"]
            .as_str()
            .unwrap()
            .contains("event.list"));
    }

    #[test]
    fn access_denied_has_no_event() {
        let value = serde_json::to_value(ChatError::AccessDenied.into_envelope()).unwrap();
        assert!(value["event"].is_null());
    }
}
