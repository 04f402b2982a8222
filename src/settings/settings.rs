use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub mysql: Mysql,
    pub rate_limit: RateLimit,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub backend: String, // "fake", "memory" or "real"
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Mysql {
    pub dsn: String, // only read by the "real" backend
}

#[derive(Debug, Deserialize)]
pub struct RateLimit {
    pub enabled: bool,
    pub sweep_idle_secs: u64,
    pub general: ClassPolicy,
    pub auth: ClassPolicy,
    pub sensitive: ClassPolicy,
}

#[derive(Debug, Deserialize)]
pub struct ClassPolicy {
    pub rate_per_minute: u32,
    pub burst: u32,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
