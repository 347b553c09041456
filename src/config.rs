use crate::error::ExecError;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::routing::{RoutingTable, Upstream, UpstreamTarget};
use crate::store::Family;
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PROVIDER_URL: &str = "https://offline.turfinfo.api.pmu.fr";
pub const DEFAULT_PROVIDER_VERSION: u32 = 7;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

pub const PROVIDER_URL_ENV: &str = "PMU_PROVIDER_URL";
pub const BACKEND_URL_ENV: &str = "PMU_BACKEND_URL";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamsConfig {
    pub provider_url: String,
    pub provider_version: u32,
    pub backend_url: String,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            provider_version: DEFAULT_PROVIDER_VERSION,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

/// Per-family deadlines in milliseconds; unset families use `default_ms`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub default_ms: u64,
    pub programme_ms: Option<u64>,
    pub reunion_ms: Option<u64>,
    pub participants_ms: Option<u64>,
    pub value_bets_ms: Option<u64>,
    pub combinations_ms: Option<u64>,
    pub daily_bets_ms: Option<u64>,
    pub backend_ms: Option<u64>,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_TIMEOUT_MS,
            programme_ms: None,
            reunion_ms: None,
            participants_ms: None,
            value_bets_ms: None,
            combinations_ms: None,
            daily_bets_ms: None,
            backend_ms: None,
        }
    }
}

impl TimeoutsConfig {
    pub fn for_family(&self, family: Family) -> Duration {
        let ms = match family {
            Family::Programme => self.programme_ms,
            Family::Reunion => self.reunion_ms,
            Family::Participants => self.participants_ms,
            Family::ValueBets => self.value_bets_ms,
            Family::Combinations => self.combinations_ms,
            Family::DailyBets => self.daily_bets_ms,
        };
        Duration::from_millis(ms.unwrap_or(self.default_ms))
    }

    /// Deadline for stateless backend calls (manual bets, reports, ...).
    pub fn for_backend(&self) -> Duration {
        Duration::from_millis(self.backend_ms.unwrap_or(self.default_ms))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            multiplier: defaults.multiplier,
            jitter: defaults.jitter,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RouteConfig {
    pub prefix: String,
    pub upstream: Upstream,
    #[serde(default)]
    pub rewrite: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub upstreams: UpstreamsConfig,
    pub timeouts: TimeoutsConfig,
    pub retry: RetrySettings,
    /// Ordered; empty means the default table.
    pub routes: Vec<RouteConfig>,
}

impl Config {
    /// Load `config.toml` from the working directory.
    pub fn new() -> Result<Self> {
        Self::from_file("config.toml")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&config_str)?;
        info!("Config loaded from {}: {:?}", path.as_ref().display(), config);
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace base URLs from `PMU_PROVIDER_URL` / `PMU_BACKEND_URL`, then
    /// validate the result.
    pub fn with_env_overrides(self) -> Result<Self, ExecError> {
        self.with_overrides(
            std::env::var(PROVIDER_URL_ENV).ok(),
            std::env::var(BACKEND_URL_ENV).ok(),
        )
    }

    /// Empty values are ignored. The whole config is re-validated, so a bad
    /// override fails here rather than on the first request.
    pub fn with_overrides(
        mut self,
        provider_url: Option<String>,
        backend_url: Option<String>,
    ) -> Result<Self, ExecError> {
        if let Some(url) = provider_url.filter(|u| !u.is_empty()) {
            self.upstreams.provider_url = url;
        }
        if let Some(url) = backend_url.filter(|u| !u.is_empty()) {
            self.upstreams.backend_url = url;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ExecError> {
        for url in [&self.upstreams.provider_url, &self.upstreams.backend_url] {
            check_origin(url)?;
        }
        if self.timeouts.default_ms == 0 {
            return Err(ExecError::Config("timeouts.default_ms must be > 0".into()));
        }
        for route in &self.routes {
            if !route.prefix.starts_with('/') {
                return Err(ExecError::Config(format!(
                    "route prefix {:?} must start with '/'",
                    route.prefix
                )));
            }
            if let Some(rewrite) = &route.rewrite {
                if !rewrite.is_empty() && !rewrite.starts_with('/') {
                    return Err(ExecError::Config(format!(
                        "route rewrite {rewrite:?} must start with '/'"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn routing_table(&self) -> RoutingTable {
        if self.routes.is_empty() {
            return RoutingTable::default_table(
                &self.upstreams.provider_url,
                self.upstreams.provider_version,
                &self.upstreams.backend_url,
            );
        }

        RoutingTable::new(
            self.routes
                .iter()
                .map(|route| {
                    let origin = match route.upstream {
                        Upstream::Provider => &self.upstreams.provider_url,
                        Upstream::Backend => &self.upstreams.backend_url,
                    };
                    UpstreamTarget {
                        prefix: route.prefix.clone(),
                        upstream: route.upstream,
                        origin: origin.clone(),
                        rewrite: route.rewrite.clone(),
                        accept_invalid_certs: route.accept_invalid_certs,
                    }
                })
                .collect(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
            jitter: self.retry.jitter,
        })
    }
}

fn check_origin(url: &str) -> Result<(), ExecError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ExecError::Config(format!("invalid upstream URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ExecError::Config(format!(
            "upstream URL {url:?} has unsupported scheme {other:?}"
        ))),
    }
}
