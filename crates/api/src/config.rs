//! Process configuration read from the environment.

use std::net::SocketAddr;

use anyhow::Context;

use rolegate_observability::LogFormat;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// Postgres connection string; `None` runs on the seeded in-memory stores.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl ApiConfig {
    /// Read `ROLEGATE_BIND`, `JWT_SECRET`, `DATABASE_URL` and `ROLEGATE_LOG_FORMAT`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind: SocketAddr = lookup("ROLEGATE_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .context("ROLEGATE_BIND must be a socket address")?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let log_format = match lookup("ROLEGATE_LOG_FORMAT") {
            Some(raw) => raw.parse().context("ROLEGATE_LOG_FORMAT")?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind,
            jwt_secret,
            database_url,
            log_format,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
