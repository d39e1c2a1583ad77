// Configuration documents written during setup
//
// `ServerConfig` lands in `config.json`, `ClientConfig` in `public/config.json`.
// Field names match what the forum server reads at startup.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const UPLOAD_PATH: &str = "/public/uploads";
pub const BCRYPT_ROUNDS: u32 = 12;
pub const API_SUFFIX: &str = "/api/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Scheme and host only; never carries a path.
    pub base_url: String,
    pub port: u16,
    pub use_port: bool,
    pub secret: String,
    pub redis: RedisConfig,
    pub bcrypt_rounds: u32,
    pub upload_path: String,
    pub relative_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketConfig {
    pub address: String,
}

/// Public subset served to browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub socket: SocketConfig,
    pub api_url: String,
    pub relative_path: String,
}

/// Application defaults written to the settings store on every install.
pub fn baseline_settings() -> Vec<(&'static str, Value)> {
    vec![
        ("postDelay", json!(10000)),
        ("minimumPostLength", json!(8)),
        ("minimumTitleLength", json!(3)),
        ("minimumUsernameLength", json!(2)),
        ("maximumUsernameLength", json!(16)),
        ("minimumPasswordLength", json!(6)),
        ("imgurClientID", json!("")),
    ]
}
