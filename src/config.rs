/// Gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the server binds to.
    pub port: u16,
    /// Optional JSON fixture of `{id, username, token}` records seeded into
    /// the in-memory store and token registry at startup.
    pub users_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            users_file: std::env::var("CHAT_USERS_FILE")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}
