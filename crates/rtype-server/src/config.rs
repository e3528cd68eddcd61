use serde::Deserialize;
use std::path::Path;

/// Server tunables (spec.md §6.3): the listen port is the one thing a deploy
/// typically overrides from the command line; everything else has a default
/// sane enough to run unmodified. Anything not listed here is a gameplay
/// tunable and flows to clients through `GamerulePacket` instead.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_clients")]
    pub max_clients: u32,
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    #[serde(default = "default_screen_width")]
    pub screen_width: f32,
    #[serde(default = "default_screen_height")]
    pub screen_height: f32,
    #[serde(default = "default_matchmaking_min_players")]
    pub matchmaking_min_players: usize,
    #[serde(default = "default_matchmaking_max_players")]
    pub matchmaking_max_players: usize,
    #[serde(default = "default_max_room_players")]
    pub max_room_players: u32,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_accounts_path")]
    pub accounts_path: String,
    #[serde(default = "default_server_id")]
    pub server_id: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    4242
}

fn default_max_clients() -> u32 {
    64
}

fn default_tick_rate_hz() -> u32 {
    60
}

fn default_screen_width() -> f32 {
    1920.0
}

fn default_screen_height() -> f32 {
    1080.0
}

fn default_matchmaking_min_players() -> usize {
    2
}

fn default_matchmaking_max_players() -> usize {
    4
}

fn default_max_room_players() -> u32 {
    8
}

fn default_inactivity_timeout_secs() -> u64 {
    30
}

fn default_ping_interval_secs() -> u64 {
    5
}

fn default_accounts_path() -> String {
    "accounts.json".into()
}

fn default_server_id() -> String {
    "rtype-server".into()
}

fn default_protocol_version() -> u32 {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_clients: default_max_clients(),
            tick_rate_hz: default_tick_rate_hz(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            matchmaking_min_players: default_matchmaking_min_players(),
            matchmaking_max_players: default_matchmaking_max_players(),
            max_room_players: default_max_room_players(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            accounts_path: default_accounts_path(),
            server_id: default_server_id(),
            protocol_version: default_protocol_version(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ServerConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}
