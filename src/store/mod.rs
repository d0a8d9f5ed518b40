pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Message, MessageId, Participant, Room, RoomKind, User, UserId};

pub use memory::MemStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstraction over the persistence store.
///
/// Backed by an external database in production and an in-memory
/// implementation for the dev server and tests. All writes are
/// single-entity operations assumed atomic at the store level.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn users(&self) -> StoreResult<Vec<User>>;

    async fn create_room(&self, name: &str, kind: RoomKind) -> StoreResult<Room>;
    async fn room(&self, id: Uuid) -> StoreResult<Option<Room>>;
    /// Delete a room, cascading to its participants and messages.
    async fn delete_room(&self, id: Uuid) -> StoreResult<()>;
    /// Every room the user participates in, paired with their creator flag.
    async fn rooms_for_user(&self, user_id: UserId) -> StoreResult<Vec<(Room, bool)>>;

    /// Get-or-create a participant row. Returns whether a new row was made.
    async fn add_participant(
        &self,
        room_id: Uuid,
        user_id: UserId,
        is_creator: bool,
    ) -> StoreResult<bool>;
    /// Remove a participant if present. Returns whether a row was removed.
    async fn remove_participant(&self, room_id: Uuid, user_id: UserId) -> StoreResult<bool>;
    async fn participants(&self, room_id: Uuid) -> StoreResult<Vec<Participant>>;

    async fn create_message(
        &self,
        room_id: Uuid,
        user_id: UserId,
        text: &str,
    ) -> StoreResult<Message>;
    /// Messages for a room, ordered by creation time ascending.
    async fn messages(&self, room_id: Uuid) -> StoreResult<Vec<Message>>;
    /// Flip a message's viewed flag. The only mutation messages ever see.
    async fn mark_viewed(&self, id: MessageId) -> StoreResult<()>;
}
