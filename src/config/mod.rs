use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let store_backend: StoreBackend = env_or("STORE_BACKEND", "postgres").parse()?;

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(env_or_err("DATABASE_URL")?),
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: env_or_parse("ACCESS_TTL_MINUTES", "15")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    decode_key_32(key, &value)
}

pub fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}
