use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "changeme", "change-me", "secret"];

#[derive(Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub admin_email: String,
    /// Seeds the intermediary account on first start when set.
    pub admin_password: Option<String>,
    pub admin_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.into());

        let jwt_secret = var("DEALROOM_JWT_SECRET").context("DEALROOM_JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("DEALROOM_JWT_SECRET is a placeholder or shorter than 16 bytes");
        }

        let host = or("DEALROOM_HOST", "0.0.0.0");
        let port: u16 = or("DEALROOM_PORT", "3000")
            .parse()
            .context("DEALROOM_PORT is not a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let token_days: i64 = or("DEALROOM_TOKEN_TTL_DAYS", "30")
            .parse()
            .context("DEALROOM_TOKEN_TTL_DAYS is not a number")?;
        let cache_secs: u64 = or("DEALROOM_ADMIN_CACHE_TTL_SECS", "300")
            .parse()
            .context("DEALROOM_ADMIN_CACHE_TTL_SECS is not a number")?;

        Ok(Self {
            addr,
            db_path: PathBuf::from(or("DEALROOM_DB_PATH", "dealroom.db")),
            jwt_secret,
            token_ttl: chrono::Duration::days(token_days),
            admin_email: or("DEALROOM_ADMIN_EMAIL", "admin@dealroom.local"),
            admin_password: var("DEALROOM_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            admin_cache_ttl: Duration::from_secs(cache_secs),
        })
    }
}
