//! In-memory reference implementation of the persistence store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::{Message, MessageId, Participant, Room, RoomKind, User, UserId};

use super::{ChatStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    rooms: HashMap<Uuid, Room>,
    // Insertion order is kept so listings are deterministic.
    participants: Vec<Participant>,
    messages: Vec<Message>,
    next_message_id: MessageId,
}

pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Seed a user into the directory. Not part of `ChatStore` — user
    /// identity is owned by the external provider; this exists for the dev
    /// server fixture and tests.
    pub fn insert_user(&self, user: User) {
        self.tables.write().users.insert(user.id, user);
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for MemStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().users.values().cloned().collect())
    }

    async fn create_room(&self, name: &str, kind: RoomKind) -> StoreResult<Room> {
        let room = Room {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
        };
        self.tables.write().rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn room(&self, id: Uuid) -> StoreResult<Option<Room>> {
        Ok(self.tables.read().rooms.get(&id).cloned())
    }

    async fn delete_room(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.rooms.remove(&id).ok_or(StoreError::NotFound)?;
        tables.participants.retain(|p| p.room_id != id);
        tables.messages.retain(|m| m.room_id != id);
        Ok(())
    }

    async fn rooms_for_user(&self, user_id: UserId) -> StoreResult<Vec<(Room, bool)>> {
        let tables = self.tables.read();
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                tables
                    .rooms
                    .get(&p.room_id)
                    .map(|room| (room.clone(), p.is_creator))
            })
            .collect())
    }

    async fn add_participant(
        &self,
        room_id: Uuid,
        user_id: UserId,
        is_creator: bool,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if !tables.rooms.contains_key(&room_id) {
            return Err(StoreError::NotFound);
        }
        if tables
            .participants
            .iter()
            .any(|p| p.room_id == room_id && p.user_id == user_id)
        {
            return Ok(false);
        }
        tables.participants.push(Participant {
            room_id,
            user_id,
            is_creator,
        });
        Ok(true)
    }

    async fn remove_participant(&self, room_id: Uuid, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.participants.len();
        tables
            .participants
            .retain(|p| !(p.room_id == room_id && p.user_id == user_id));
        Ok(tables.participants.len() < before)
    }

    async fn participants(&self, room_id: Uuid) -> StoreResult<Vec<Participant>> {
        Ok(self
            .tables
            .read()
            .participants
            .iter()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn create_message(
        &self,
        room_id: Uuid,
        user_id: UserId,
        text: &str,
    ) -> StoreResult<Message> {
        let mut tables = self.tables.write();
        if !tables.rooms.contains_key(&room_id) {
            return Err(StoreError::NotFound);
        }
        tables.next_message_id += 1;
        let message = Message {
            id: tables.next_message_id,
            room_id,
            user_id,
            text: text.to_string(),
            is_viewed: false,
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn messages(&self, room_id: Uuid) -> StoreResult<Vec<Message>> {
        let tables = self.tables.read();
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        // Ids are assigned in creation order; they break timestamp ties.
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }

    async fn mark_viewed(&self, id: MessageId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        message.is_viewed = true;
        Ok(())
    }
}
