use serde::Serialize;
use uuid::Uuid;

use super::user::UserId;

/// Membership link between a user and a room. Every room has exactly one
/// participant with `is_creator` set, assigned at room creation.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub room_id: Uuid,
    pub user_id: UserId,
    pub is_creator: bool,
}
