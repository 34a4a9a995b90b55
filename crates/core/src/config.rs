use std::net::SocketAddr;

/// Validated, immutable configuration snapshot loaded once at startup from
/// the environment variables in the external-interfaces table. There is no
/// file to watch and no hot-reload: every field here is either fixed for the
/// process lifetime or re-read per-request from the agent record itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub redis_addr: String,
    pub redis_password: Option<String>,
    pub redis_db: i64,
    pub max_request_body_size: usize,
    pub agent_directory_ttl_secs: u64,
    pub rate_limit_key_prefix: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8082".parse().expect("default listen addr"),
            redis_addr: "localhost:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            max_request_body_size: 10 * 1024 * 1024,
            agent_directory_ttl_secs: 30,
            rate_limit_key_prefix: "agent_connector".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, falling back to the
    /// documented defaults for anything unset, then validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = std::env::var("DATA_FLOW_API_HOST").ok();
        let port = std::env::var("DATA_FLOW_API_PORT").ok();
        let listen_addr = match (host, port) {
            (None, None) => defaults.listen_addr,
            (host, port) => {
                let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
                let port = port.unwrap_or_else(|| "8082".to_string());
                let joined = format!("{host}:{port}");
                joined.parse().map_err(|e| ConfigError::InvalidValue {
                    name: "DATA_FLOW_API_HOST/DATA_FLOW_API_PORT",
                    value: joined,
                    reason: format!("{e}"),
                })?
            }
        };

        let redis_addr = std::env::var("REDIS_ADDR").unwrap_or(defaults.redis_addr);
        let redis_password = std::env::var("REDIS_PASSWORD")
            .ok()
            .filter(|v| !v.is_empty());
        let redis_db = env_parsed("REDIS_DB", defaults.redis_db)?;
        let max_request_body_size =
            env_parsed("MAX_REQUEST_BODY_SIZE", defaults.max_request_body_size)?;
        let agent_directory_ttl_secs = env_parsed(
            "AGENT_DIRECTORY_TTL_SECS",
            defaults.agent_directory_ttl_secs,
        )?
        .min(60);
        let rate_limit_key_prefix =
            std::env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.rate_limit_key_prefix);

        let config = Self {
            listen_addr,
            redis_addr,
            redis_password,
            redis_db,
            max_request_body_size,
            agent_directory_ttl_secs,
            rate_limit_key_prefix,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_request_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_REQUEST_BODY_SIZE",
                value: self.max_request_body_size.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
