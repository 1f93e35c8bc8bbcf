//! The [`Platform`] bundle: configuration, forge port, and rule engine.

use std::sync::Arc;
use std::time::Duration;

use orgward_forge::{ForgePort, ReadOnlyForge};

use crate::rules::RuleEngine;

/// Application configuration shared by the CLI and the daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of this application; doubles as the queue message group id.
    pub name: String,
    /// Version of this application.
    pub version: String,
    /// Interval at which metrics are reported.
    pub metrics_interval: Duration,
    /// Bucket holding the forge audit data (the user mapping object).
    pub audit_bucket: String,
    /// URL of the FIFO queue used for asynchronous processing.
    pub queue_url: String,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "orgward".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_interval: Duration::from_secs(30),
            audit_bucket: String::new(),
            queue_url: String::new(),
            webhook_secret: String::new(),
        }
    }
}

/// Everything an engine operation needs: configuration, the forge port, and
/// the rule engine bound to that port.
pub struct Platform {
    config: Config,
    forge: Arc<dyn ForgePort>,
    rules: RuleEngine,
}

impl Platform {
    /// A platform whose writes reach the forge.
    pub fn new(config: Config, forge: Arc<dyn ForgePort>) -> Self {
        let rules = RuleEngine::with_builtin_rules(forge.clone());
        Self {
            config,
            forge,
            rules,
        }
    }

    /// A dry-run platform: the port is wrapped read-only, so every write is
    /// a no-op while reads still reflect the live forge.
    pub fn read_only(config: Config, forge: Arc<dyn ForgePort>) -> Self {
        let forge: Arc<dyn ForgePort> = Arc::new(ReadOnlyForge::new(forge));
        Self::new(config, forge)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn forge(&self) -> Arc<dyn ForgePort> {
        self.forge.clone()
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }
}
