// src/config.rs
//! Provider configuration: rate budgets, retry policy, transport timeouts.
//! Loaded once at startup; immutable afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const ENV_PATH: &str = "AGGREGATOR_CONFIG_PATH";

/// Bounded-retry policy for one provider's transport calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetryPolicy {
    /// Upper bound on any single backoff sleep, however the policy is tuned.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based):
    /// `base * factor^(attempt-1)`, capped at [`Self::MAX_BACKOFF`].
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_factor.powi(exp).max(0.0);
        let delay_ms = self.base_delay_ms as f64 * factor;
        if !delay_ms.is_finite() || delay_ms >= Self::MAX_BACKOFF.as_millis() as f64 {
            return Self::MAX_BACKOFF;
        }
        Duration::from_millis(delay_ms.round() as u64)
    }
}

/// Per-provider budget and transport settings. Supplied at manager
/// initialization, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_request_budget")]
    pub request_budget: u32,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_request_budget() -> u32 {
    30
}
fn default_window_ms() -> u64 {
    60_000
}
fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_budget: default_request_budget(),
            window_ms: default_window_ms(),
            retry: RetryPolicy::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ProviderConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One configured provider: where to reach it plus its budgets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderEntry {
    /// Base URL of the provider endpoint. Adapters fall back to their
    /// built-in default when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(flatten)]
    pub config: ProviderConfig,
}

/// Full aggregator configuration: the provider set and the default subset
/// queried when a caller does not name providers explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatorConfig {
    /// Providers queried when the caller passes no subset. Empty means
    /// "all configured providers".
    #[serde(default)]
    pub default_providers: Vec<String>,
    pub providers: BTreeMap<String, ProviderEntry>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert("jobwire".to_string(), ProviderEntry::default());
        providers.insert("feedhire".to_string(), ProviderEntry::default());
        Self {
            default_providers: Vec::new(),
            providers,
        }
    }
}

impl AggregatorConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/providers.toml
    /// 3) config/providers.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("AGGREGATOR_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/providers.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/providers.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        // Try TOML first if hinted or content looks like toml.
        let try_toml = hint_ext == "toml" || s.contains("[providers");
        if try_toml {
            if let Ok(v) = toml::from_str::<Self>(s) {
                return Ok(v);
            }
        }
        if let Ok(v) = serde_json::from_str::<Self>(s) {
            return Ok(v);
        }
        if !try_toml {
            if let Ok(v) = toml::from_str::<Self>(s) {
                return Ok(v);
            }
        }
        Err(anyhow!("unsupported aggregator config format"))
    }
}
