//! Environment configuration for the daemon process.

use std::time::Duration;

use crate::error::DaemonError;

const REGION_ENV_KEY: &str = "REGION";
const HTTP_PORT_ENV_KEY: &str = "PORT";
const CONFIG_SECRET_ENV_KEY: &str = "CONFIG_SECRET_ID";
const AUDIT_BUCKET_ENV_KEY: &str = "GITHUB_AUDIT_BUCKET";
const QUEUE_URL_ENV_KEY: &str = "QUEUE_URL";
const METRICS_INTERVAL_ENV_KEY: &str = "METRICS_INTERVAL";

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_HTTP_PORT: &str = "8000";
const DEFAULT_CONFIG_SECRET_ID: &str = "orgward/config";
const DEFAULT_AUDIT_BUCKET: &str = "orgward-github-audit";
const DEFAULT_QUEUE_URL: &str = "";
const DEFAULT_METRICS_INTERVAL: &str = "30s";

/// Daemon process configuration, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub region: String,
    pub http_port: u16,
    pub config_secret_id: String,
    pub audit_bucket: String,
    pub queue_url: String,
    pub metrics_interval: Duration,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, DaemonError> {
        let port = config_value(HTTP_PORT_ENV_KEY, DEFAULT_HTTP_PORT);
        let http_port: u16 = port
            .parse()
            .map_err(|_| DaemonError::Config(format!("bad port number: {port}")))?;

        let interval = config_value(METRICS_INTERVAL_ENV_KEY, DEFAULT_METRICS_INTERVAL);
        let metrics_interval = parse_duration(&interval)
            .ok_or_else(|| DaemonError::Config(format!("bad duration: {interval}")))?;

        Ok(Self {
            region: config_value(REGION_ENV_KEY, DEFAULT_REGION),
            http_port,
            config_secret_id: config_value(CONFIG_SECRET_ENV_KEY, DEFAULT_CONFIG_SECRET_ID),
            audit_bucket: config_value(AUDIT_BUCKET_ENV_KEY, DEFAULT_AUDIT_BUCKET),
            queue_url: config_value(QUEUE_URL_ENV_KEY, DEFAULT_QUEUE_URL),
            metrics_interval,
        })
    }
}

fn config_value(env_key: &str, default_value: &str) -> String {
    std::env::var(env_key).unwrap_or_else(|_| default_value.to_string())
}

/// Parse a `30s` / `5m` / `250ms` / `1h` style duration.
fn parse_duration(v: &str) -> Option<Duration> {
    let v = v.trim();
    let (number, unit) = match v.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => v.split_at(split),
        None => (v, "s"),
    };
    let number: u64 = number.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(number)),
        "s" => Some(Duration::from_secs(number)),
        "m" => Some(Duration::from_secs(number * 60)),
        "h" => Some(Duration::from_secs(number * 3600)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("15"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("10y"), None);
    }

    #[test]
    fn defaults_apply_when_env_is_unset() {
        std::env::remove_var(HTTP_PORT_ENV_KEY);
        std::env::remove_var(METRICS_INTERVAL_ENV_KEY);

        let config = DaemonConfig::from_env().expect("config");
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.metrics_interval, Duration::from_secs(30));
        assert_eq!(config.config_secret_id, "orgward/config");
    }
}
