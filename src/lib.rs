pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;

use std::sync::Arc;

use auth::AuthProvider;
use config::Config;
use gateway::fanout::BroadcastFabric;
use store::ChatStore;

/// Shared application state available to all connection handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub fabric: Arc<BroadcastFabric>,
    pub config: Arc<Config>,
}
