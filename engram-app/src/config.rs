//! Environment configuration surface (spec §6). Config loading itself is a
//! named non-goal of the core, but the top-level wiring object still has to
//! read *something* to pick a port, a provider, and a database — so this
//! mirrors the teacher's flat `env::var` + fallback style rather than
//! reaching for a config-file crate the teacher doesn't use here.

use std::env;
use std::str::FromStr;

use engram_core::errors::{EngramError, EngramResult};

use crate::providers::{EmbeddingProviderKind, LlmProviderKind};

/// `LOG_LEVEL` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = EngramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(EngramError::ConfigError(format!("unknown LOG_LEVEL: {other}"))),
        }
    }
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Everything the process reads from its environment at startup (spec §6
/// "Configuration surface"). Fields not named by the spec (worker tick
/// overrides, tenant enumeration) are additive — see DESIGN.md.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_port: u16,
    pub llm_provider: LlmProviderKind,
    pub embedding_provider: EmbeddingProviderKind,
    pub rate_limit_rps: u32,
    pub rate_limit_burst: u32,
    pub log_level: LogLevel,
    pub migrations_path: String,
    /// The store contracts have no "list tenants" capability (§4.2 only
    /// offers `list_distinct_agent_ids(tenant_id)`), so the set of tenants
    /// workers sweep over must come from somewhere outside the store.
    /// `ENGRAM_TENANT_IDS` (comma-separated) fills that gap; see DESIGN.md
    /// "Tenant enumeration".
    pub tenant_ids: Vec<String>,
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> EngramResult<T>
where
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| EngramError::ConfigError(format!("invalid {key}: {e}"))),
    }
}

impl AppConfig {
    /// Read configuration from the process environment. `DATABASE_URL` is
    /// the only required variable (spec §6); everything else falls back to
    /// the documented default.
    pub fn from_env() -> EngramResult<Self> {
        let database_url = env_var("DATABASE_URL")
            .ok_or_else(|| EngramError::ConfigError("DATABASE_URL is required".to_string()))?;

        let llm_provider = match env_var("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => LlmProviderKind::Mock,
        };
        let embedding_provider = match env_var("EMBEDDING_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => EmbeddingProviderKind::Mock,
        };

        let tenant_ids = env_var("ENGRAM_TENANT_IDS")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_else(|| vec!["default".to_string()]);

        Ok(Self {
            database_url,
            server_port: parse_env("SERVER_PORT", 8080)?,
            llm_provider,
            embedding_provider,
            rate_limit_rps: parse_env("RATE_LIMIT_RPS", 100)?,
            rate_limit_burst: parse_env("RATE_LIMIT_BURST", 20)?,
            log_level: match env_var("LOG_LEVEL") {
                Some(raw) => raw.parse()?,
                None => LogLevel::Info,
            },
            migrations_path: env_var("MIGRATIONS_PATH").unwrap_or_else(|| "migrations".to_string()),
            tenant_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_rejects_unknown_value() {
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    }
}
