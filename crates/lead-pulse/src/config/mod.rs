use crate::workflows::bitrix::{CrmSettings, DEFAULT_REQUEST_TIMEOUT};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SETTINGS_PATH: &str = "data/crm-settings.json";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub crm: CrmConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            crm: CrmConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bitrix24 connection defaults and demo-mode controls.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Seed settings from the environment; settings saved from the dashboard
    /// take precedence.
    pub settings: Option<CrmSettings>,
    pub settings_path: PathBuf,
    pub demo_seed: Option<u64>,
    pub request_timeout: Duration,
}

impl CrmConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let domain = non_empty_var("BITRIX_DOMAIN");
        let webhook = non_empty_var("BITRIX_WEBHOOK");
        let settings = match (domain, webhook) {
            (Some(domain), Some(webhook)) => Some(CrmSettings::new(
                domain,
                webhook,
                non_empty_var("BITRIX_USER_ID"),
            )),
            _ => None,
        };

        let settings_path: PathBuf = non_empty_var("LEAD_PULSE_SETTINGS_PATH")
            .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string())
            .into();

        let demo_seed = non_empty_var("LEAD_PULSE_DEMO_SEED")
            .map(|raw| raw.parse::<u64>().map_err(|_| ConfigError::InvalidDemoSeed))
            .transpose()?;

        let request_timeout = match non_empty_var("BITRIX_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout),
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            settings,
            settings_path,
            demo_seed,
            request_timeout,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDemoSeed,
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDemoSeed => {
                write!(f, "LEAD_PULSE_DEMO_SEED must be an unsigned integer")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "BITRIX_TIMEOUT_SECS must be a positive number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDemoSeed
            | ConfigError::InvalidTimeout => None,
        }
    }
}
