use std::net::SocketAddr;
use std::path::PathBuf;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FORMDESK_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("FORMDESK_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let db_path = lookup("FORMDESK_DB_PATH").unwrap_or_else(|| "formdesk.db".into());
        let host = lookup("FORMDESK_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "FORMDESK_PORT", 3000u16)?;
        let ttl_hours = parse_var(&lookup, "FORMDESK_TOKEN_TTL_HOURS", 720i64)?; // 30 days

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: "FORMDESK_HOST",
                value: host.clone(),
            })?;

        Ok(Self {
            jwt_secret,
            db_path: db_path.into(),
            addr,
            token_ttl: chrono::Duration::hours(ttl_hours),
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}
