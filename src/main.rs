use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_gateway::auth::TokenRegistry;
use chat_gateway::config::Config;
use chat_gateway::gateway::fanout::BroadcastFabric;
use chat_gateway::gateway::server;
use chat_gateway::models::User;
use chat_gateway::store::MemStore;
use chat_gateway::AppState;

/// One record of the optional startup fixture file.
#[derive(serde::Deserialize)]
struct SeedUser {
    id: i64,
    username: String,
    token: String,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // In-memory reference store and token registry. Swap for the real
    // persistence store / auth provider behind the same traits.
    let store = Arc::new(MemStore::new());
    let auth = Arc::new(TokenRegistry::new());

    if let Some(path) = &config.users_file {
        seed_users(&store, &auth, path);
    }

    let state = AppState {
        store,
        auth,
        fabric: Arc::new(BroadcastFabric::new()),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = server::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "chat-gateway listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}

fn seed_users(store: &MemStore, auth: &TokenRegistry, path: &str) {
    let raw = std::fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {path}: {err}"));
    let seeds: Vec<SeedUser> =
        serde_json::from_str(&raw).unwrap_or_else(|err| panic!("invalid fixture {path}: {err}"));

    let count = seeds.len();
    for seed in seeds {
        let user = User {
            id: seed.id,
            username: seed.username,
        };
        auth.issue(&seed.token, user.clone());
        store.insert_user(user);
    }
    tracing::info!(count, path, "seeded users from fixture");
}
