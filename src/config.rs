use std::net::SocketAddr;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "bankfeed", about = "Bankfeed - aggregation API gateway with per-user persistence")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "bankfeed.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default = "default_remote")]
    pub remote: RemoteConfig,

    #[serde(default = "default_sync")]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// When true, all API endpoints require a bearer token that maps to a user.
    #[serde(default)]
    pub enabled: bool,

    /// Static bearer tokens. Each token resolves to a user id.
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenEntry {
    pub uid: String,
    pub token: String,
}

/// Connection details for the upstream aggregation API.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_products")]
    pub products: Vec<String>,

    #[serde(default = "default_country_codes")]
    pub country_codes: Vec<String>,

    /// OAuth redirect URI sent when creating link tokens. Omitted when empty.
    #[serde(default)]
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Transactions requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Upper bound on pages fetched in one run, in case the remote
    /// keeps reporting an unreached total.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Days of history covered by the full-lookback window.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Persist fetched records after a sync.
    #[serde(default)]
    pub store_data: bool,

    /// Report poller retry budget.
    #[serde(default = "default_report_attempts")]
    pub report_attempts: u32,

    /// Seconds between report poll attempts.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Days the remote retains a generated report.
    #[serde(default = "default_report_retention_days")]
    pub report_retention_days: i32,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_remote() -> RemoteConfig {
    RemoteConfig {
        base_url: default_base_url(),
        client_id: String::new(),
        secret: String::new(),
        products: default_products(),
        country_codes: default_country_codes(),
        redirect_uri: String::new(),
    }
}

fn default_sync() -> SyncConfig {
    SyncConfig {
        page_size: default_page_size(),
        max_pages: default_max_pages(),
        lookback_days: default_lookback_days(),
        store_data: false,
        report_attempts: default_report_attempts(),
        report_interval_secs: default_report_interval_secs(),
        report_retention_days: default_report_retention_days(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://sandbox.plaid.com".to_string()
}

fn default_products() -> Vec<String> {
    vec!["transactions".to_string()]
}

fn default_country_codes() -> Vec<String> {
    vec!["US".to_string()]
}

fn default_page_size() -> i64 {
    200
}

fn default_max_pages() -> u32 {
    1000
}

fn default_lookback_days() -> i64 {
    730
}

fn default_report_attempts() -> u32 {
    20
}

fn default_report_interval_secs() -> u64 {
    1
}

fn default_report_retention_days() -> i32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
            logging: default_logging(),
            auth: AuthConfig::default(),
            remote: default_remote(),
            sync: default_sync(),
        }
    }
}

impl Config {
    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }

        config
    }

    pub fn listen_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid listen address")
    }
}
