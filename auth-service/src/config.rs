/// Configuration management
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// In-process stores. State does not survive a restart.
    Memory,
    /// Postgres-backed identities, Redis-backed lockout/revocation state.
    Durable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Process-wide HS256 signing secret. Required.
    pub jwt_secret: String,

    /// Storage backend, chosen once at startup.
    #[serde(default = "default_storage")]
    pub storage: StorageMode,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,

    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,
    #[serde(default = "default_lockout_duration")]
    pub lockout_duration_secs: u64,

    /// Issuer label shown in authenticator apps.
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8084
}

fn default_storage() -> StorageMode {
    StorageMode::Memory
}

fn default_lockout_threshold() -> u32 {
    5
}

fn default_lockout_duration() -> u64 {
    3600
}

fn default_totp_issuer() -> String {
    "Argent".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        let config: Self = envy::from_env()?;
        if config.storage == StorageMode::Durable
            && (config.database_url.is_none() || config.redis_url.is_none())
        {
            return Err(envy::Error::Custom(
                "STORAGE=durable requires DATABASE_URL and REDIS_URL".to_string(),
            ));
        }
        Ok(config)
    }
}
