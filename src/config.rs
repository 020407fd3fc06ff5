use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_QUEUE_TTL_SECS;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Caché compartida entre procesos. Sin URL, el bot corre con el store
    // en memoria (un solo proceso, sin vistas hermanas).
    pub redis_url: Option<String>,
    pub queue_ttl_secs: u64,

    // Nodo Lavalink
    pub lavalink_host: String,
    pub lavalink_port: u16,
    pub lavalink_password: String,
    pub lavalink_session_id: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            queue_ttl_secs: std::env::var("QUEUE_TTL")
                .unwrap_or_else(|_| DEFAULT_QUEUE_TTL_SECS.to_string())
                .parse()?,

            lavalink_host: std::env::var("LAVALINK_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            lavalink_port: std::env::var("LAVALINK_PORT")
                .unwrap_or_else(|_| "2333".to_string())
                .parse()?,
            lavalink_password: std::env::var("LAVALINK_PASSWORD")
                .unwrap_or_else(|_| "youshallnotpass".to_string()),
            lavalink_session_id: std::env::var("LAVALINK_SESSION_ID")
                .unwrap_or_else(|_| "logos-bot".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_ttl_secs == 0 {
            anyhow::bail!("Queue TTL must be greater than 0");
        }

        if self.lavalink_host.trim().is_empty() {
            anyhow::bail!("Lavalink host cannot be empty");
        }

        if self.lavalink_session_id.trim().is_empty() {
            anyhow::bail!("Lavalink session id cannot be empty");
        }

        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                anyhow::bail!("REDIS_URL must start with redis:// or rediss://, got: {url}");
            }
        }

        Ok(())
    }

    /// Resumen seguro para logs: sin password.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Store: {} (queue TTL {}s)\n  \
            Lavalink: {}:{} (session {})",
            self.redis_url.as_deref().unwrap_or("in-memory"),
            self.queue_ttl_secs,
            self.lavalink_host,
            self.lavalink_port,
            self.lavalink_session_id,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            queue_ttl_secs: DEFAULT_QUEUE_TTL_SECS,
            lavalink_host: "localhost".to_string(),
            lavalink_port: 2333,
            lavalink_password: "youshallnotpass".to_string(),
            lavalink_session_id: "logos-bot".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = Config {
            queue_ttl_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_redis_scheme_is_rejected() {
        let config = Config {
            redis_url: Some("http://localhost:6379".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn summary_never_leaks_the_password() {
        let config = Config {
            lavalink_password: "hunter2".to_string(),
            ..Config::default()
        };
        assert!(!config.summary().contains("hunter2"));
    }
}
