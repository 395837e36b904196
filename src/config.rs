use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.football-data.org/v4";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// How upstream status codes are reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Relay the upstream status with the upstream body.
    #[default]
    Passthrough,
    /// Answer 200 for any JSON body, whatever upstream said.
    Normalize,
}

impl FromStr for StatusPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "normalize" => Ok(Self::Normalize),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub host: IpAddr,
    pub port: u16,
    pub upstream_base_url: String,
    /// `None` leaves the HTTP client without a timeout.
    pub upstream_timeout: Option<Duration>,
    pub sweep_interval: Duration,
    pub status_policy: StatusPolicy,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("FOOTBALL_DATA_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let host: IpAddr = parse_or(&lookup, "HOST", DEFAULT_HOST.parse().ok())?;
        let port: u16 = parse_or(&lookup, "PORT", Some(DEFAULT_PORT))?;
        let timeout_secs: u64 =
            parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", Some(DEFAULT_TIMEOUT_SECS))?;
        let sweep_secs: u64 = parse_or(
            &lookup,
            "CACHE_SWEEP_INTERVAL_SECS",
            Some(DEFAULT_SWEEP_INTERVAL_SECS),
        )?;
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "CACHE_SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        let status_policy = parse_or(
            &lookup,
            "UPSTREAM_STATUS_MODE",
            Some(StatusPolicy::default()),
        )?;

        let upstream_base_url = lookup("UPSTREAM_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());

        Ok(Self {
            api_key,
            host,
            port,
            upstream_base_url,
            upstream_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            sweep_interval: Duration::from_secs(sweep_secs),
            status_policy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw.clone(),
        }),
        None => default.ok_or(ConfigError::InvalidValue {
            name,
            value: String::new(),
        }),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("sweep_interval", &self.sweep_interval)
            .field("status_policy", &self.status_policy)
            .finish()
    }
}
