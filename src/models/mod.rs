pub mod message;
pub mod participant;
pub mod room;
pub mod user;

pub use message::{Message, MessageId};
pub use participant::Participant;
pub use room::{Room, RoomKind};
pub use user::{User, UserId};
