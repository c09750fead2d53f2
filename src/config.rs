use std::env;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("JWT_SECRET must be at least {MIN_SECRET_LEN} characters long")]
    WeakSecret,
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

pub const MIN_SECRET_LEN: usize = 32;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub frontend_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Same as `from_env` with an injectable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
            match raw {
                None => Ok(default),
                Some(v) => v.parse().map_err(|_| ConfigError::Invalid(name, v)),
            }
        }

        let secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let database_url = get("DATABASE_URL");
        if cfg!(feature = "postgres-store") && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse("PORT", get("PORT"), 8080)?,
            database_url,
            db_max_connections: parse("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5)?,
            frontend_url: get("FRONTEND_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

    #[test]
    fn defaults_apply() {
        let mut pairs = vec![("JWT_SECRET", SECRET)];
        if cfg!(feature = "postgres-store") {
            pairs.push(("DATABASE_URL", "postgres://localhost/forum"));
        }
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_max_connections, 5);
    }

    #[test]
    fn secret_rules() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])).unwrap_err(),
            ConfigError::WeakSecret
        );
    }

    #[test]
    fn bad_port_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://localhost/forum"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("PORT", "eighty".into()));
    }
}
