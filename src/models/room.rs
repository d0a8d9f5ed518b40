use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room type tag. A `Dialog` is a 1:1 conversation and must be created with
/// exactly one non-creator participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Group,
    Dialog,
}

impl RoomKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "group" => Some(RoomKind::Group),
            "dialog" => Some(RoomKind::Dialog),
            _ => None,
        }
    }
}

/// A chat context containing participants and messages. The identifier is
/// generated at creation and never reused.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub kind: RoomKind,
}

impl Room {
    /// Deterministic client-facing link for this room.
    pub fn link(&self) -> String {
        format!("chat/{}", self.id)
    }
}
