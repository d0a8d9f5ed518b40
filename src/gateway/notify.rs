//! Notification hook: explicit publish calls at the two persistence write
//! paths that create rows (messages, participants). The `is_viewed` update
//! never comes through here, so reads cannot re-trigger notifications.

use serde_json::json;

use crate::models::{Message, Room, RoomKind, User};
use crate::store::StoreResult;
use crate::AppState;

use super::envelope::EventName;
use super::fanout::{personal_group, Publication};

/// Notify every other participant of the message's room on their personal
/// group. Fire-and-forget: participants without a live personal session
/// miss the notification.
pub async fn message_created(
    state: &AppState,
    room: &Room,
    message: &Message,
    sender: &User,
) -> StoreResult<()> {
    let payload = json!({
        "type": "new message",
        "group": room.name,
        "sender": sender.username,
        "message": message.text,
    });

    for participant in state.store.participants(room.id).await? {
        if participant.user_id == sender.id {
            continue;
        }
        state.fabric.publish(
            &personal_group(participant.user_id),
            Publication::new(EventName::SEND_NOTIFICATION, payload.clone()),
        );
    }
    Ok(())
}

/// Notify a user that they were added to a group room. Dialog rooms and the
/// creator's own row are silent.
pub fn participant_added(state: &AppState, room: &Room, user: &User, is_creator: bool) {
    if room.kind == RoomKind::Dialog || is_creator {
        return;
    }
    state.fabric.publish(
        &personal_group(user.id),
        Publication::new(
            EventName::SEND_NOTIFICATION,
            json!({
                "type": "new group",
                "message": format!("You were added to group {}", room.name),
            }),
        ),
    );
}
