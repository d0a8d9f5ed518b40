use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::user::UserId;

pub type MessageId = u64;

/// Outbound timestamp format used in message payloads.
pub const SENT_AT_FORMAT: &str = "%d/%m/%Y, %H:%M";

/// A message in a room. `is_viewed` starts false and flips true exactly
/// once, the first time a participant other than the sender lists the
/// room's messages.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: Uuid,
    pub user_id: UserId,
    pub text: String,
    pub is_viewed: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creation timestamp formatted for the wire.
    pub fn sent_at(&self) -> String {
        self.created_at.format(SENT_AT_FORMAT).to_string()
    }
}
