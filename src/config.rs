// src/config.rs - Environment-driven configuration
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_ms: u64,
}

/// TTLs are per cached view; the default applies to any view without its own
/// setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub default_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub dashboard_ttl_seconds: u64,
    pub quiz_performance_ttl_seconds: u64,
    pub quiz_stats_ttl_seconds: u64,
    pub study_goals_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    /// Load configuration from environment variables with usable defaults.
    pub fn load() -> Result<Self> {
        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/studymate".to_string()),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("Invalid DATABASE_MIN_CONNECTIONS")?,
            connection_timeout_ms: env::var("DATABASE_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .context("Invalid DATABASE_TIMEOUT_MS")?,
        };

        let cache = CacheConfig {
            default_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid CACHE_TTL_SECONDS")?,
            sweep_interval_seconds: env::var("CACHE_SWEEP_INTERVAL")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("Invalid CACHE_SWEEP_INTERVAL")?,
            dashboard_ttl_seconds: env::var("CACHE_DASHBOARD_TTL")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid CACHE_DASHBOARD_TTL")?,
            quiz_performance_ttl_seconds: env::var("CACHE_QUIZ_PERFORMANCE_TTL")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("Invalid CACHE_QUIZ_PERFORMANCE_TTL")?,
            quiz_stats_ttl_seconds: env::var("CACHE_QUIZ_STATS_TTL")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid CACHE_QUIZ_STATS_TTL")?,
            study_goals_ttl_seconds: env::var("CACHE_STUDY_GOALS_TTL")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid CACHE_STUDY_GOALS_TTL")?,
        };

        let server = ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()
                .context("Invalid PORT")?,
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            database,
            cache,
            server,
            logging,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("Database URL cannot be empty"));
        }
        if self.database.max_connections < self.database.min_connections {
            return Err(anyhow::anyhow!(
                "Max connections must be >= min connections"
            ));
        }
        if self.cache.default_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("Cache TTL must be > 0"));
        }
        if self.cache.sweep_interval_seconds == 0 {
            return Err(anyhow::anyhow!("Cache sweep interval must be > 0"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be valid"));
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn dashboard_ttl(&self) -> Duration {
        Duration::from_secs(self.dashboard_ttl_seconds)
    }

    pub fn quiz_performance_ttl(&self) -> Duration {
        Duration::from_secs(self.quiz_performance_ttl_seconds)
    }

    pub fn quiz_stats_ttl(&self) -> Duration {
        Duration::from_secs(self.quiz_stats_ttl_seconds)
    }

    pub fn study_goals_ttl(&self) -> Duration {
        Duration::from_secs(self.study_goals_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                url: "postgresql://localhost:5432/studymate".to_string(),
                max_connections: 10,
                min_connections: 2,
                connection_timeout_ms: 30000,
            },
            cache: CacheConfig {
                default_ttl_seconds: 60,
                sweep_interval_seconds: 120,
                dashboard_ttl_seconds: 300,
                quiz_performance_ttl_seconds: 600,
                quiz_stats_ttl_seconds: 300,
                study_goals_ttl_seconds: 60,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5001,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn base_config_validates() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = base_config();
        config.cache.default_ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_pool_bounds_are_rejected() {
        let mut config = base_config();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn ttl_accessors_convert_to_durations() {
        let config = base_config();
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.dashboard_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.quiz_performance_ttl(), Duration::from_secs(600));
    }
}
