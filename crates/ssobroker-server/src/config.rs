use serde::{Deserialize, Serialize};
use ssobroker_auth::{BrokerConfig, UserRecord};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Code exchange engine configuration
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Browser session cookie
    #[serde(default)]
    pub cookie: CookieConfig,
    /// Service-to-service endpoints
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Static user directory
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let prefix = &self.server.url_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err("server.url_prefix must start with '/' and not end with '/'".into());
        }
        if RESERVED_PREFIXES.contains(&prefix.as_str()) {
            return Err(format!("server.url_prefix must not be one of {RESERVED_PREFIXES:?}"));
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Cookie validation
        if self.cookie.name.is_empty() {
            return Err("cookie.name must not be empty".into());
        }
        if self.cookie.secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "cookie.secret must be at least {MIN_SECRET_LEN} bytes"
            ));
        }
        if self.cookie.max_age.is_zero() {
            return Err("cookie.max_age must be > 0".into());
        }
        // RPC validation
        if self.rpc.secret.is_empty() {
            return Err("rpc.secret must not be empty".into());
        }
        // Broker validation
        self.broker
            .validate()
            .map_err(|e| format!("broker config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

/// Shortest accepted cookie signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Prefixes already taken by the API, RPC and health routes.
const RESERVED_PREFIXES: [&str; 3] = ["/api", "/rpc", "/healthz"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Mount point of the browser routes, e.g. "/sso". Empty mounts them at the root.
    #[serde(default)]
    pub url_prefix: String,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            url_prefix: String::new(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// Secret the session cookie is signed with.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_cookie_max_age", with = "humantime_serde")]
    pub max_age: Duration,
}

fn default_cookie_name() -> String {
    "user".into()
}
fn default_cookie_max_age() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            secret: String::new(),
            max_age: default_cookie_max_age(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RpcConfig {
    /// Shared secret for the `hash` request signature.
    #[serde(default)]
    pub secret: String,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, used when no path is given.
    pub const DEFAULT_CONFIG_PATH: &str = "ssobroker.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., SSOBROKER__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("SSOBROKER")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}
