//! Bearer-token identity resolution for connection handshakes.

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use dashmap::DashMap;

use crate::models::User;

/// The identity attached to a connection after the gateway resolves its
/// bearer token. Anonymous is not an error here — session handlers reject
/// it at connect time.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(User),
}

/// Abstraction over the external auth provider: resolves a validated
/// bearer token to a user, or `None` for unknown/expired tokens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<User>;
}

/// In-memory token registry used by the dev server and tests.
pub struct TokenRegistry {
    tokens: DashMap<String, User>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    pub fn issue(&self, token: &str, user: User) {
        self.tokens.insert(token.to_string(), user);
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for TokenRegistry {
    async fn resolve(&self, token: &str) -> Option<User> {
        self.tokens.get(token).map(|entry| entry.clone())
    }
}

/// Resolve the connection identity from the upgrade request headers.
///
/// The expected header form is `authorization: Token <value>`. A missing or
/// malformed header yields an anonymous identity, never an error.
pub async fn identify(provider: &dyn AuthProvider, headers: &HeaderMap) -> Identity {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Identity::Anonymous;
    };

    let mut parts = value.split_whitespace();
    let token = match (parts.next(), parts.next(), parts.next()) {
        (Some("Token"), Some(token), None) => token,
        _ => return Identity::Anonymous,
    };

    match provider.resolve(token).await {
        Some(user) => Identity::User(user),
        None => Identity::Anonymous,
    }
}
