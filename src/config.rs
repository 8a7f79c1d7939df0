//! Runtime configuration read from the environment (and an optional `.env` file)
use std::env;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use log::error;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_TCMB_URL: &str = "https://www.tcmb.gov.tr/kurlar/today.xml";
pub const DEFAULT_FRED_URL: &str = "https://api.stlouisfed.org";
pub const DEFAULT_EVDS_URL: &str = "https://evds2.tcmb.gov.tr/service/evds";
pub const DEFAULT_TEFAS_URL: &str = "https://www.tefas.gov.tr";
pub const DEFAULT_TUIK_URL: &str = "https://data.tuik.gov.tr";
pub const DEFAULT_DOVIZ_URL: &str = "https://www.doviz.com";

/// Get an environment variable parsed as `T`, falling back to `default` if it is
/// missing or cannot be parsed
pub fn get_env_or_default<T: FromStr>(env_var: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    match env::var(env_var) {
        Ok(val) => val.parse::<T>().unwrap_or_else(|_| {
            error!("Failed to parse {}: {}, using default", env_var, val);
            default
        }),
        Err(_) => default,
    }
}

/// Get an environment variable parsed as `T`, or `None` if missing, empty or invalid
pub fn get_env_or_none<T: FromStr>(env_var: &str) -> Option<T>
where
    <T as FromStr>::Err: Debug,
{
    match env::var(env_var) {
        Ok(val) if !val.trim().is_empty() => val.parse::<T>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string, the in-memory store is used if not set
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Base urls of all external data sources
#[derive(Debug, Clone)]
pub struct ProviderUrls {
    pub yahoo: String,
    pub tcmb: String,
    pub fred: String,
    pub evds: String,
    pub tefas: String,
    pub tuik: String,
    pub doviz: String,
}

impl Default for ProviderUrls {
    fn default() -> Self {
        ProviderUrls {
            yahoo: DEFAULT_YAHOO_URL.to_string(),
            tcmb: DEFAULT_TCMB_URL.to_string(),
            fred: DEFAULT_FRED_URL.to_string(),
            evds: DEFAULT_EVDS_URL.to_string(),
            tefas: DEFAULT_TEFAS_URL.to_string(),
            tuik: DEFAULT_TUIK_URL.to_string(),
            doviz: DEFAULT_DOVIZ_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub alert_check_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub providers: ProviderUrls,
    pub http: HttpConfig,
    pub scheduler: SchedulerConfig,
    pub fred_api_key: Option<String>,
    pub evds_api_key: Option<String>,
    pub notify_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            providers: ProviderUrls::default(),
            http: HttpConfig::default(),
            scheduler: SchedulerConfig {
                enabled: true,
                alert_check_interval: Duration::from_secs(300),
            },
            fred_api_key: None,
            evds_api_key: None,
            notify_webhook_url: None,
        }
    }
}

impl Config {
    /// Build configuration from environment variables, loading `.env` first if present
    pub fn from_env() -> Config {
        dotenv::dotenv().ok();
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: get_env_or_default("HOST", defaults.server.host),
                port: get_env_or_default("PORT", defaults.server.port),
            },
            database: DatabaseConfig {
                url: get_env_or_none("DATABASE_URL"),
                max_connections: get_env_or_default(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                ),
            },
            providers: ProviderUrls {
                yahoo: get_env_or_default("YAHOO_BASE_URL", defaults.providers.yahoo),
                tcmb: get_env_or_default("TCMB_URL", defaults.providers.tcmb),
                fred: get_env_or_default("FRED_BASE_URL", defaults.providers.fred),
                evds: get_env_or_default("EVDS_BASE_URL", defaults.providers.evds),
                tefas: get_env_or_default("TEFAS_BASE_URL", defaults.providers.tefas),
                tuik: get_env_or_default("TUIK_BASE_URL", defaults.providers.tuik),
                doviz: get_env_or_default("DOVIZ_URL", defaults.providers.doviz),
            },
            http: HttpConfig {
                timeout: Duration::from_secs(get_env_or_default("HTTP_TIMEOUT_SECS", 30)),
                max_retries: get_env_or_default("HTTP_MAX_RETRIES", defaults.http.max_retries),
                retry_delay: Duration::from_millis(get_env_or_default("HTTP_RETRY_DELAY_MS", 2000)),
            },
            scheduler: SchedulerConfig {
                enabled: get_env_or_default("SCHEDULER_ENABLED", true),
                alert_check_interval: Duration::from_secs(get_env_or_default(
                    "ALERT_CHECK_INTERVAL_SECS",
                    300,
                )),
            },
            fred_api_key: get_env_or_none("FRED_API_KEY"),
            evds_api_key: get_env_or_none("EVDS_API_KEY"),
            notify_webhook_url: get_env_or_none("NOTIFY_WEBHOOK_URL"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_or_default() {
        env::set_var("FINPANO_TEST_PORT", "8080");
        assert_eq!(get_env_or_default("FINPANO_TEST_PORT", 3001u16), 8080);
        env::set_var("FINPANO_TEST_BAD_PORT", "not-a-port");
        assert_eq!(get_env_or_default("FINPANO_TEST_BAD_PORT", 3001u16), 3001);
        assert_eq!(get_env_or_default("FINPANO_TEST_UNSET", 42u32), 42);
    }

    #[test]
    fn test_get_env_or_none() {
        env::set_var("FINPANO_TEST_KEY", "abc");
        assert_eq!(
            get_env_or_none::<String>("FINPANO_TEST_KEY"),
            Some("abc".to_string())
        );
        env::set_var("FINPANO_TEST_EMPTY", " ");
        assert_eq!(get_env_or_none::<String>("FINPANO_TEST_EMPTY"), None);
        assert_eq!(get_env_or_none::<String>("FINPANO_TEST_MISSING"), None);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
        assert!(config.database.url.is_none());
        assert_eq!(config.http.max_retries, 3);
        assert!(config.evds_api_key.is_none());
        assert_eq!(config.providers.evds, DEFAULT_EVDS_URL);
    }
}
