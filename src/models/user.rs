use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// A user known to the external identity provider. Referenced by rooms,
/// participants and messages; never owned or mutated by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}
