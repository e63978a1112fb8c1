use std::env;

use crate::services::batch_recalculator::DEFAULT_CONCURRENCY;
use crate::services::reports::DEFAULT_LIMIT;

/// Which storage backend serves the ledger, snapshots, and catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    InMemory,
    Postgres,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::InMemory => "inmemory",
            StoreType::Postgres => "postgres",
        }
    }
}

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub store_type: StoreType,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub recalc_concurrency: usize,
    pub report_default_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same rules as `from_env`, reading values through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_type = match lookup("STORE_TYPE")
            .unwrap_or_else(|| "inmemory".to_string())
            .to_lowercase()
            .as_str()
        {
            "inmemory" | "memory" => StoreType::InMemory,
            "postgres" | "pg" => StoreType::Postgres,
            other => {
                return Err(format!(
                    "Invalid STORE_TYPE: {}. Must be 'inmemory' or 'postgres'",
                    other
                ))
            }
        };

        let database_url = lookup("DATABASE_URL");
        if store_type == StoreType::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORE_TYPE=postgres".to_string());
        }

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "8095".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let recalc_concurrency = positive(&lookup, "RECALC_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        let report_default_limit = positive(&lookup, "REPORT_DEFAULT_LIMIT", DEFAULT_LIMIT)?;

        Ok(Config {
            store_type,
            database_url,
            host,
            port,
            recalc_concurrency,
            report_default_limit,
        })
    }
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> Result<usize, String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(format!("{} must be a positive integer", key)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.store_type, StoreType::InMemory);
        assert_eq!(config.port, 8095);
        assert_eq!(config.recalc_concurrency, 4);
        assert_eq!(config.report_default_limit, 10);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(config(&[("STORE_TYPE", "postgres")]).is_err());

        let config = config(&[
            ("STORE_TYPE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/shop"),
        ])
        .unwrap();
        assert_eq!(config.store_type, StoreType::Postgres);
    }

    #[test]
    fn test_rejects_zero_concurrency_and_bad_port() {
        assert!(config(&[("RECALC_CONCURRENCY", "0")]).is_err());
        assert!(config(&[("REPORT_DEFAULT_LIMIT", "ten")]).is_err());
        assert!(config(&[("PORT", "99999")]).is_err());
        assert!(config(&[("STORE_TYPE", "redis")]).is_err());
    }
}
