use std::{
    env::{self, VarError},
    time::Duration,
};

use url::Url;

const DEFAULT_DATABASE: &str = "shortener";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongodb_uri: String,
    pub database: String,
    /// Used for short links when the request carries no `Origin` header.
    pub base_url: Option<String>,
    pub port: u16,
    pub store_timeout: Duration,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when `MONGODB_URI` is absent or any variable holds an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env::var)
    }

    fn from_lookup(
        lookup: impl Fn(&'static str) -> Result<String, VarError>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &'static str| match lookup(name) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
        };

        let mongodb_uri = var("MONGODB_URI")?.ok_or(ConfigError::Missing("MONGODB_URI"))?;
        let database = var("MONGODB_DB")?.unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let base_url = match var("BASE_URL")? {
            Some(value) => {
                let valid = value
                    .parse::<Url>()
                    .is_ok_and(|url| matches!(url.scheme(), "https" | "http"));
                if !valid {
                    return Err(ConfigError::Invalid {
                        name: "BASE_URL",
                        value,
                    });
                }
                Some(value.trim_end_matches('/').to_string())
            }
            None => {
                tracing::warn!("BASE_URL not set; short links will use the request origin or host");
                None
            }
        };

        let port = match var("PORT")? {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let timeout_ms = match var("STORE_TIMEOUT_MS")? {
            Some(value) => match value.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "STORE_TIMEOUT_MS",
                        value,
                    });
                }
            },
            None => DEFAULT_STORE_TIMEOUT_MS,
        };

        Ok(Self {
            mongodb_uri,
            database,
            base_url,
            port,
            store_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
