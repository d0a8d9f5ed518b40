//! Personal session: the user's private channel for directory and
//! group-management events, and the delivery point for notifications.

use axum::extract::ws::WebSocket;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::error::ChatError;
use crate::models::{RoomKind, User};
use crate::AppState;

use super::envelope::{Envelope, EventName, Frame};
use super::fanout::personal_group;
use super::notify;
use super::session::{self, EventSession, Reply};

/// Run a personal session over an accepted WebSocket.
pub async fn run(socket: WebSocket, state: AppState, identity: Identity) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let Some(user) = session::gate_authenticated(&mut ws_tx, identity).await else {
        return;
    };

    let group = personal_group(user.id);
    let mut group_rx = state.fabric.join(&group);
    tracing::info!(user_id = user.id, username = %user.username, "personal session established");

    let mut handler = PersonalSession {
        state: state.clone(),
        user,
    };
    session::drive(&mut handler, &mut ws_tx, &mut ws_rx, &mut group_rx).await;

    drop(group_rx);
    state.fabric.leave(&group);
    tracing::info!(user_id = handler.user.id, "personal session ended");
}

struct PersonalSession {
    state: AppState,
    user: User,
}

impl EventSession for PersonalSession {
    async fn dispatch(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        match frame.event.as_str() {
            EventName::GROUP_CREATE => self.group_create(frame).await,
            EventName::GROUP_LIST => self.group_list(frame).await,
            EventName::GROUP_DELETE => self.group_delete(frame).await,
            EventName::USER_LIST => self.user_list(frame).await,
            EventName::EVENT_LIST => self.event_list(frame),
            _ => Err(ChatError::UnknownEvent(frame.event.clone())),
        }
    }
}

impl PersonalSession {
    async fn group_create(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        let name = frame.data.get("name").and_then(Value::as_str);
        let participants = frame.data.get("participants").and_then(Value::as_array);
        let kind = frame
            .data
            .get("type")
            .and_then(Value::as_str)
            .and_then(RoomKind::parse);

        let (Some(name), Some(participants), Some(kind)) = (name, participants, kind) else {
            return Err(invalid_create_payload());
        };
        if kind == RoomKind::Dialog && participants.len() != 1 {
            return Err(invalid_create_payload());
        }

        let store = &self.state.store;
        let room = store.create_room(name, kind).await?;
        store.add_participant(room.id, self.user.id, true).await?;
        notify::participant_added(&self.state, &room, &self.user, true);

        // Best-effort: unknown ids are skipped, not an error.
        for value in participants {
            let Some(id) = value.as_i64() else { continue };
            let Some(user) = store.user(id).await? else {
                continue;
            };
            if store.add_participant(room.id, user.id, false).await? {
                notify::participant_added(&self.state, &room, &user, false);
            }
        }

        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            json!({ "detail": format!("Group {} was created", room.name) }),
        )))
    }

    async fn group_list(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        let rooms = self.state.store.rooms_for_user(self.user.id).await?;
        let listing: Vec<Value> = rooms
            .iter()
            .map(|(room, is_creator)| {
                json!({
                    "group_uuid": room.id.to_string(),
                    "group_name": room.name,
                    "group_link": room.link(),
                    "is_creator": is_creator,
                })
            })
            .collect();
        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            Value::Array(listing),
        )))
    }

    async fn group_delete(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        let Some(name) = frame.data.get("group").and_then(Value::as_str) else {
            return Err(invalid_delete_payload());
        };

        // Resolve the name against the caller's own created rooms.
        let rooms = self.state.store.rooms_for_user(self.user.id).await?;
        let Some((room, _)) = rooms
            .iter()
            .find(|(room, is_creator)| *is_creator && room.name == name)
        else {
            return Err(invalid_delete_payload());
        };

        self.state.store.delete_room(room.id).await?;
        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            json!({ "detail": format!("Group {name} was deleted") }),
        )))
    }

    async fn user_list(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        let users = self.state.store.users().await?;
        let listing: Vec<Value> = users
            .iter()
            .filter(|user| user.id != self.user.id)
            .map(|user| json!({ "id": user.id, "username": user.username }))
            .collect();
        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            Value::Array(listing),
        )))
    }

    fn event_list(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            json!({
                "available_events": [
                    EventName::GROUP_CREATE,
                    EventName::GROUP_LIST,
                    EventName::GROUP_DELETE,
                    EventName::USER_LIST,
                    EventName::EVENT_LIST,
                ]
            }),
        )))
    }
}

fn invalid_create_payload() -> ChatError {
    ChatError::Validation {
        detail: "Invalid data",
        example: json!({
            "name": "your_group_name",
            "participants": [1, 2, 3],
            "type": "group",
        }),
        event: None,
    }
}

fn invalid_delete_payload() -> ChatError {
    ChatError::Validation {
        detail: "Invalid data",
        example: json!({ "group": "GroupName" }),
        event: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::TokenRegistry;
    use crate::config::Config;
    use crate::gateway::fanout::BroadcastFabric;
    use crate::store::MemStore;

    fn test_state() -> AppState {
        let store = Arc::new(MemStore::new());
        for (id, username) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            store.insert_user(User {
                id,
                username: username.to_string(),
            });
        }
        AppState {
            store,
            auth: Arc::new(TokenRegistry::new()),
            fabric: Arc::new(BroadcastFabric::new()),
            config: Arc::new(Config {
                port: 0,
                users_file: None,
            }),
        }
    }

    fn session_for(state: &AppState, id: i64, username: &str) -> PersonalSession {
        PersonalSession {
            state: state.clone(),
            user: User {
                id,
                username: username.to_string(),
            },
        }
    }

    fn frame(event: &str, data: Value) -> Frame {
        Frame {
            event: event.to_string(),
            data: data.as_object().unwrap().clone(),
        }
    }

    #[tokio::test]
    async fn dialog_requires_exactly_one_participant() {
        let state = test_state();
        let mut session = session_for(&state, 1, "alice");

        for participants in [json!([]), json!([2, 3])] {
            let result = session
                .dispatch(&frame(
                    "group.create",
                    json!({ "name": "Pair", "participants": participants, "type": "dialog" }),
                ))
                .await;
            assert!(matches!(result, Err(ChatError::Validation { .. })));
        }
        // No room was persisted by either failed attempt.
        assert!(state.store.rooms_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_skips_unknown_participants() {
        let state = test_state();
        let mut session = session_for(&state, 1, "alice");

        let reply = session
            .dispatch(&frame(
                "group.create",
                json!({ "name": "Team", "participants": [2, 99], "type": "group" }),
            ))
            .await
            .unwrap();
        let Reply::Envelope(envelope) = reply else {
            panic!("expected an envelope");
        };
        assert_eq!(envelope.message["detail"], "Group Team was created");

        let rooms = state.store.rooms_for_user(1).await.unwrap();
        assert_eq!(rooms.len(), 1);
        let participants = state.store.participants(rooms[0].0.id).await.unwrap();
        assert_eq!(participants.len(), 2, "unknown id 99 skipped");
    }

    #[tokio::test]
    async fn delete_requires_ownership() {
        let state = test_state();
        let mut alice = session_for(&state, 1, "alice");
        let mut bob = session_for(&state, 2, "bob");

        alice
            .dispatch(&frame(
                "group.create",
                json!({ "name": "Team", "participants": [2], "type": "group" }),
            ))
            .await
            .unwrap();

        let result = bob
            .dispatch(&frame("group.delete", json!({ "group": "Team" })))
            .await;
        assert!(matches!(result, Err(ChatError::Validation { .. })));
        assert_eq!(state.store.rooms_for_user(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn user_list_excludes_caller() {
        let state = test_state();
        let mut session = session_for(&state, 1, "alice");

        let Reply::Envelope(envelope) = session
            .dispatch(&frame("user.list", json!({})))
            .await
            .unwrap()
        else {
            panic!("expected an envelope");
        };
        let listing = envelope.message.as_array().unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing.iter().all(|u| u["id"] != 1));
    }

    #[tokio::test]
    async fn unknown_event_hits_default_handler() {
        let state = test_state();
        let mut session = session_for(&state, 1, "alice");
        let result = session.dispatch(&frame("group.rename", json!({}))).await;
        assert!(matches!(result, Err(ChatError::UnknownEvent(event)) if event == "group.rename"));
    }
}
