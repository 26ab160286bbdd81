use clap::Parser;
use lib_realtime::RealtimeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "LiveLink live-update client", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "LIVELINK_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "LIVELINK_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "LIVELINK_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "LIVELINK_CHANNEL_URL", help = "Push channel URL (ws:// or wss://).")]
    pub channel_url: Option<String>,

    #[clap(long, env = "LIVELINK_REST_BASE_URL", help = "Base URL of the REST read endpoint used in polling fallback.")]
    pub rest_base_url: Option<String>,

    #[clap(long, env = "LIVELINK_CATEGORIES", help = "Comma-separated event categories to subscribe to.")]
    pub categories: Option<String>,

    #[clap(long, env = "LIVELINK_RECONNECT_BASE_DELAY_MS", help = "Base delay in milliseconds between reconnect attempts.")]
    pub reconnect_base_delay_ms: Option<u64>,

    #[clap(long, env = "LIVELINK_RECONNECT_MAX_DELAY_MS", help = "Maximum delay in milliseconds between reconnect attempts.")]
    pub reconnect_max_delay_ms: Option<u64>,

    #[clap(long, env = "LIVELINK_MAX_RECONNECT_ATTEMPTS", help = "Consecutive failures tolerated before polling fallback.")]
    pub max_reconnect_attempts: Option<u32>,

    #[clap(long, env = "LIVELINK_HEARTBEAT_INTERVAL_SECONDS", help = "Seconds between liveness probes on the open channel.")]
    pub heartbeat_interval_seconds: Option<u64>,

    #[clap(long, env = "LIVELINK_HEARTBEAT_TIMEOUT_SECONDS", help = "Seconds a probe may go unacknowledged before reconnecting.")]
    pub heartbeat_timeout_seconds: Option<u64>,

    #[clap(long, env = "LIVELINK_CONNECT_TIMEOUT_SECONDS", help = "Seconds allowed for a single channel-open attempt.")]
    pub connect_timeout_seconds: Option<u64>,

    #[clap(long, env = "LIVELINK_POLL_INTERVAL_SECONDS", help = "Seconds between pull requests while in polling fallback.")]
    pub poll_interval_seconds: Option<u64>,

    #[clap(long, env = "LIVELINK_QUEUE_CAPACITY", help = "Outbound frames buffered while disconnected.")]
    pub queue_capacity: Option<usize>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            channel_url: other.channel_url.or(self.channel_url),
            rest_base_url: other.rest_base_url.or(self.rest_base_url),
            categories: other.categories.or(self.categories),
            reconnect_base_delay_ms: other.reconnect_base_delay_ms.or(self.reconnect_base_delay_ms),
            reconnect_max_delay_ms: other.reconnect_max_delay_ms.or(self.reconnect_max_delay_ms),
            max_reconnect_attempts: other.max_reconnect_attempts.or(self.max_reconnect_attempts),
            heartbeat_interval_seconds: other
                .heartbeat_interval_seconds
                .or(self.heartbeat_interval_seconds),
            heartbeat_timeout_seconds: other
                .heartbeat_timeout_seconds
                .or(self.heartbeat_timeout_seconds),
            connect_timeout_seconds: other
                .connect_timeout_seconds
                .or(self.connect_timeout_seconds),
            poll_interval_seconds: other.poll_interval_seconds.or(self.poll_interval_seconds),
            queue_capacity: other.queue_capacity.or(self.queue_capacity),
        }
    }

    /// The categories list, split and trimmed.
    pub fn category_list(&self) -> Vec<String> {
        self.categories
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Lowers the layered options onto the library's config, falling back
    /// to its defaults for anything left unset.
    pub fn to_realtime_config(&self) -> RealtimeConfig {
        let defaults = RealtimeConfig::default();
        RealtimeConfig {
            channel_url: self
                .channel_url
                .clone()
                .unwrap_or(defaults.channel_url),
            rest_base_url: self
                .rest_base_url
                .clone()
                .unwrap_or(defaults.rest_base_url),
            heartbeat_interval: self
                .heartbeat_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            heartbeat_timeout: self
                .heartbeat_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_timeout),
            connect_timeout: self
                .connect_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            reconnect_base_delay: self
                .reconnect_base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_base_delay),
            reconnect_max_delay: self
                .reconnect_max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_max_delay),
            max_reconnect_attempts: self
                .max_reconnect_attempts
                .unwrap_or(defaults.max_reconnect_attempts),
            poll_interval: self
                .poll_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            queue_capacity: self.queue_capacity.unwrap_or(defaults.queue_capacity),
        }
    }
}

pub fn load_config() -> Config {
    // 1. Load defaults
    let default_config = Config {
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        channel_url: Some("wss://stream.livelink.app/ws".to_string()),
        rest_base_url: Some("https://api.livelink.app/v1/updates".to_string()),
        categories: Some("social,ecommerce".to_string()),
        reconnect_base_delay_ms: Some(1000),
        reconnect_max_delay_ms: Some(60000),
        max_reconnect_attempts: Some(5),
        heartbeat_interval_seconds: Some(30),
        heartbeat_timeout_seconds: Some(10),
        connect_timeout_seconds: Some(10),
        poll_interval_seconds: Some(30),
        queue_capacity: Some(256),
        ..Default::default()
    };

    // 2. Load from config file (client_live.conf) if present.
    //    Allow overriding default config file path with CLI arg.
    let cli_args_for_path = Config::parse();

    let config_file_path = cli_args_for_path
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("client_live.conf"));

    let mut current_config = default_config;

    if config_file_path.exists() {
        if let Ok(config_str) = fs::read_to_string(&config_file_path) {
            if let Ok(file_config) = serde_json::from_str::<Config>(&config_str) {
                current_config = current_config.merge(file_config);
            } else {
                log::warn!(
                    "Failed to parse config file: {}. Falling back to other sources.",
                    config_file_path.display()
                );
            }
        } else {
            log::warn!(
                "Failed to read config file: {}. Falling back to other sources.",
                config_file_path.display()
            );
        }
    } else {
        log::info!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        );
    }

    // 3. Override with environment variables and CLI arguments.
    //    clap::Parser handles env vars and CLI args in one pass.
    current_config.merge(cli_args_for_path)
}
