use crate::backoff::BackoffConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub me: usize,
    pub peers: Vec<String>,

    pub bind_addr: String,
    pub bind_port: u16,

    pub rpc_timeout_ms: u64,

    pub backoff: BackoffSettings,

    pub client: ClientSettings,

    pub status_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffSettings {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            me: 0,
            peers: vec![
                "127.0.0.1:9000".to_string(),
                "127.0.0.1:9001".to_string(),
                "127.0.0.1:9002".to_string(),
            ],
            bind_addr: "0.0.0.0".to_string(),
            bind_port: 9000,
            rpc_timeout_ms: 1000,
            backoff: BackoffSettings::default(),
            client: ClientSettings::default(),
            status_interval_secs: 30,
        }
    }
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_ms: 10,
            max_ms: 100,
            multiplier: 2.0,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            retry_delay_ms: 100,
            request_timeout_ms: 5000,
        }
    }
}

impl BackoffSettings {
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial: Duration::from_millis(self.initial_ms),
            max: Duration::from_millis(self.max_ms),
            multiplier: self.multiplier,
        }
    }
}

impl ClientSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl NodeConfig {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.peers.is_empty(), "peers must list at least one address");
        anyhow::ensure!(
            self.me < self.peers.len(),
            "me = {} is out of range for {} peers",
            self.me,
            self.peers.len()
        );
        anyhow::ensure!(
            self.backoff.multiplier >= 1.0,
            "backoff multiplier must be at least 1.0"
        );
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}
