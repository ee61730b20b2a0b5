use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::mirror::{CLONE_RETRY_DELAY, MirrorSettings, REMOTE_RETRY_DELAY, SYNC_INTERVAL};
use crate::core::models::JobSpec;
use crate::core::pacing::RetryPolicy;
use crate::core::resolver::DEFAULT_METADATA_URL;
use crate::error::{ConfigError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/gitmirror/config.toml";
pub const ENV_PREFIX: &str = "GITMIRROR_";

/// Jobs whose status has not changed for this long are reported as stale.
pub const STALE_AFTER: Duration = Duration::from_secs(15 * 60);

/// Upper bound for every interval setting.
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub work_root: PathBuf,
    pub default_branch: String,
    pub remote_name: String,
    pub git_binary: PathBuf,
    pub clone_retry_secs: u64,
    pub remote_retry_secs: u64,
    pub sync_interval_secs: u64,
    pub stale_after_secs: u64,
    pub metadata_base_url: String,
    pub log_json: bool,
    pub verbose: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobSpec>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            work_root: PathBuf::from("."),
            default_branch: "master".to_string(),
            remote_name: "to".to_string(),
            git_binary: PathBuf::from("git"),
            clone_retry_secs: CLONE_RETRY_DELAY.as_secs(),
            remote_retry_secs: REMOTE_RETRY_DELAY.as_secs(),
            sync_interval_secs: SYNC_INTERVAL.as_secs(),
            stale_after_secs: STALE_AFTER.as_secs(),
            metadata_base_url: DEFAULT_METADATA_URL.to_string(),
            log_json: false,
            verbose: false,
            jobs: None,
        }
    }
}

impl AppConfig {
    /// Layer defaults, the TOML file, `GITMIRROR_*` variables and finally
    /// any CLI overrides.
    ///
    /// Without an explicit `config_file` the default path is read only if
    /// it exists.
    pub fn new<T: Serialize>(config_file: Option<&Path>, overrides: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        figment = match config_file {
            Some(path) => figment.merge(Toml::file_exact(path)),
            None => figment.merge(Toml::file(DEFAULT_CONFIG_PATH)),
        };

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject intervals that would spin (zero) or overflow date arithmetic.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("clone_retry_secs", self.clone_retry_secs),
            ("remote_retry_secs", self.remote_retry_secs),
            ("sync_interval_secs", self.sync_interval_secs),
            ("stale_after_secs", self.stale_after_secs),
        ] {
            if !(1..=MAX_INTERVAL_SECS).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    key,
                    value,
                    min: 1,
                    max: MAX_INTERVAL_SECS,
                });
            }
        }

        Ok(())
    }

    pub fn mirror_settings(&self) -> MirrorSettings {
        MirrorSettings {
            work_root: self.work_root.clone(),
            default_branch: self.default_branch.clone(),
            remote_name: self.remote_name.clone(),
            clone_retry: RetryPolicy::fixed(Duration::from_secs(self.clone_retry_secs)),
            remote_retry: RetryPolicy::fixed(Duration::from_secs(self.remote_retry_secs)),
            sync_interval: Duration::from_secs(self.sync_interval_secs),
        }
    }

    pub fn stale_after(&self) -> chrono::TimeDelta {
        i64::try_from(self.stale_after_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}
