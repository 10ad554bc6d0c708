use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContainerdError, Result};

/// Default containerd API socket.
pub const DEFAULT_ADDRESS: &str = "/run/containerd/containerd.sock";

/// Namespace used by the kubelet's CRI plugin.
pub const DEFAULT_NAMESPACE: &str = "k8s.io";

/// Connection parameters for the containerd channel.
///
/// Supplied once when the process-wide client is built and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Path of the containerd Unix socket
    pub address: PathBuf,

    /// Namespace attached to every call
    pub namespace: String,

    /// Bound on the reachability probe and on each dial, in milliseconds
    pub connect_timeout_ms: u64,

    /// Reconnect backoff
    pub backoff: BackoffConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: PathBuf::from(DEFAULT_ADDRESS),
            namespace: DEFAULT_NAMESPACE.to_string(),
            connect_timeout_ms: 2_000,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Config for the given socket and namespace with default timings.
    pub fn new(address: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Load a config file. `.yaml`/`.yml` files are parsed as YAML,
    /// anything else as JSON. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContainerdError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| ContainerdError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| ContainerdError::Config(format!("{}: {}", path.display(), e)))?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Check that the parameters describe a usable connection.
    pub fn validate(&self) -> Result<()> {
        if self.address.as_os_str().is_empty() {
            return Err(ContainerdError::Config("address must not be empty".to_string()));
        }
        if self.namespace.is_empty() {
            return Err(ContainerdError::Config("namespace must not be empty".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ContainerdError::Config(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.backoff.validate()
    }
}

/// Exponential backoff applied between dial attempts.
///
/// Defaults follow gRPC's connection backoff, with the base and cap
/// shortened for a local socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds
    pub max_delay_ms: u64,

    /// Factor applied to the delay after each failed attempt
    pub multiplier: f64,

    /// Randomization factor; each delay is spread over `delay * (1 ± jitter)`
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            max_delay_ms: 3_000,
            multiplier: 1.6,
            jitter: 0.2,
        }
    }
}

impl BackoffConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ContainerdError::Config(format!(
                "backoff base delay {}ms exceeds max delay {}ms",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(ContainerdError::Config(format!(
                "backoff multiplier must be at least 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ContainerdError::Config(format!(
                "backoff jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}
