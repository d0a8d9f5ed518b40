//! Room session: in-room messaging and membership events, with
//! creator-only permission enforcement on membership changes.

use axum::extract::ws::WebSocket;
use futures_util::StreamExt;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::ChatError;
use crate::models::{Room, User};
use crate::AppState;

use super::envelope::{Envelope, EventName, Frame};
use super::fanout::Publication;
use super::notify;
use super::session::{self, EventSession, Reply};

/// Run a room session over an accepted WebSocket.
pub async fn run(socket: WebSocket, state: AppState, identity: Identity, room_id: Uuid) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let Some(user) = session::gate_authenticated(&mut ws_tx, identity).await else {
        return;
    };

    let room = match state.store.room(room_id).await {
        Ok(Some(room)) => room,
        Ok(None) | Err(_) => {
            session::reject(&mut ws_tx, "Group not found").await;
            return;
        }
    };

    // Membership is checked against the participant set loaded here, once;
    // changes made after connect are not observed until reconnect.
    let participants = match state.store.participants(room.id).await {
        Ok(participants) => participants,
        Err(_) => {
            session::reject(&mut ws_tx, "Group not found").await;
            return;
        }
    };
    if !participants.iter().any(|p| p.user_id == user.id) {
        session::reject(&mut ws_tx, "Access denied").await;
        return;
    }

    let group = room.id.to_string();
    let mut group_rx = state.fabric.join(&group);
    tracing::info!(user_id = user.id, room_id = %room.id, "room session established");

    let mut handler = RoomSession {
        state: state.clone(),
        user,
        room,
        group: group.clone(),
    };
    session::drive(&mut handler, &mut ws_tx, &mut ws_rx, &mut group_rx).await;

    drop(group_rx);
    state.fabric.leave(&group);
    tracing::info!(user_id = handler.user.id, room_id = %handler.room.id, "room session ended");
}

struct RoomSession {
    state: AppState,
    user: User,
    room: Room,
    group: String,
}

impl EventSession for RoomSession {
    async fn dispatch(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        match frame.event.as_str() {
            EventName::SEND_MESSAGE => self.send_message(frame).await,
            EventName::LIST_MESSAGE => self.list_message(frame).await,
            EventName::ADD_PARTICIPANTS => self.add_participants(frame).await,
            EventName::DELETE_PARTICIPANT => self.delete_participant(frame).await,
            EventName::EVENT_LIST => self.event_list(frame),
            _ => Err(ChatError::UnknownEvent(frame.event.clone())),
        }
    }
}

impl RoomSession {
    /// Creator check for privileged events. The creator is re-read from the
    /// store on every invocation rather than trusted from connect time.
    async fn require_creator(&self) -> Result<(), ChatError> {
        let participants = self.state.store.participants(self.room.id).await?;
        let creator = participants.iter().find(|p| p.is_creator).map(|p| p.user_id);
        if creator == Some(self.user.id) {
            Ok(())
        } else {
            Err(ChatError::AccessDenied)
        }
    }

    async fn send_message(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        let text = frame
            .data
            .get("message")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty());
        let Some(text) = text else {
            return Err(ChatError::Validation {
                detail: "Invalid data",
                example: json!({ "message": "Hello, chat!" }),
                event: Some(frame.event.clone()),
            });
        };

        let message = self
            .state
            .store
            .create_message(self.room.id, self.user.id, text)
            .await?;
        notify::message_created(&self.state, &self.room, &message, &self.user).await?;

        // The sender's own connection is subscribed, so the broadcast is
        // also the reply.
        self.state.fabric.publish(
            &self.group,
            Publication::new(
                EventName::CHAT_MESSAGE,
                json!({
                    "message": message.text,
                    "user": self.user.username,
                    "sent_at": message.sent_at(),
                }),
            ),
        );
        Ok(Reply::Broadcast)
    }

    async fn list_message(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        let messages = self.state.store.messages(self.room.id).await?;

        let mut listing = Vec::with_capacity(messages.len());
        for message in messages {
            // Reading flips the viewed flag for everyone but the sender,
            // persisted before the reply goes out.
            if !message.is_viewed && message.user_id != self.user.id {
                self.state.store.mark_viewed(message.id).await?;
            }
            let Some(sender) = self.state.store.user(message.user_id).await? else {
                continue;
            };
            listing.push(json!({
                "text": message.text,
                "sender": sender.username,
                "sent_at": message.sent_at(),
            }));
        }

        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            json!({ "messages": listing }),
        )))
    }

    async fn add_participants(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        self.require_creator().await?;

        let invalid = || ChatError::Validation {
            detail: "Invalid input",
            example: json!({ "users": [1, 2, 3] }),
            event: Some(frame.event.clone()),
        };
        let Some(users) = frame.data.get("users").and_then(Value::as_array) else {
            return Err(invalid());
        };

        let mut added = Vec::new();
        for value in users {
            let Some(id) = value.as_i64() else { continue };
            let Some(user) = self.state.store.user(id).await? else {
                continue;
            };
            if self
                .state
                .store
                .add_participant(self.room.id, user.id, false)
                .await?
            {
                notify::participant_added(&self.state, &self.room, &user, false);
                added.push(user.username);
            }
        }

        if added.is_empty() {
            return Err(invalid());
        }
        self.state.fabric.publish(
            &self.group,
            Publication::new(
                EventName::CHAT_MESSAGE,
                json!({ "detail": format!("Users: {} were added to chat", added.join(", ")) }),
            ),
        );
        Ok(Reply::Broadcast)
    }

    async fn delete_participant(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        self.require_creator().await?;

        let invalid = || ChatError::Validation {
            detail: "Wrong input data",
            example: json!({ "user": 1 }),
            event: Some(frame.event.clone()),
        };
        let Some(id) = frame.data.get("user").and_then(Value::as_i64) else {
            return Err(invalid());
        };
        // The creator cannot remove themselves.
        if id == self.user.id {
            return Err(invalid());
        }
        let Some(user) = self.state.store.user(id).await? else {
            return Err(invalid());
        };
        if !self
            .state
            .store
            .remove_participant(self.room.id, user.id)
            .await?
        {
            return Err(invalid());
        }

        self.state.fabric.publish(
            &self.group,
            Publication::new(
                EventName::CHAT_MESSAGE,
                json!({ "detail": format!("User {} was deleted", user.username) }),
            ),
        );
        Ok(Reply::Broadcast)
    }

    fn event_list(&mut self, frame: &Frame) -> Result<Reply, ChatError> {
        Ok(Reply::Envelope(Envelope::ok(
            Some(frame.event.clone()),
            json!({
                "available_events": [
                    EventName::SEND_MESSAGE,
                    EventName::LIST_MESSAGE,
                    EventName::ADD_PARTICIPANTS,
                    EventName::DELETE_PARTICIPANT,
                    EventName::EVENT_LIST,
                ]
            }),
        )))
    }
}
