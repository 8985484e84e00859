//! sakuraform.yaml の内容

use crate::error::{ConfigError, Result};
use sakuraform_cloud::{OperationTimeouts, PollPolicies, PollPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ZONE: &str = "is1b";
pub const DEFAULT_API_ROOT_URL: &str = "https://secure.sakura.ad.jp/cloud/zone";

/// Engine settings
///
/// ```yaml
/// zone: tk1b
/// timeouts:
///   create_minutes: 90
/// polling:
///   readiness:
///     pending_sleep_secs: 15
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_zone")]
    pub zone: String,

    #[serde(default = "default_api_root_url")]
    pub api_root_url: String,

    #[serde(default)]
    pub timeouts: TimeoutSettings,

    #[serde(default)]
    pub polling: PollingSettings,
}

fn default_zone() -> String {
    DEFAULT_ZONE.to_string()
}

fn default_api_root_url() -> String {
    DEFAULT_API_ROOT_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zone: default_zone(),
            api_root_url: default_api_root_url(),
            timeouts: TimeoutSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self> {
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: origin.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, path)
    }

    fn validate(&self) -> Result<()> {
        if self.zone.trim().is_empty() {
            return Err(ConfigError::Invalid("zone が空です".to_string()));
        }
        self.timeouts.validate()?;
        for (name, policy) in [
            ("readiness", self.polling.readiness),
            ("down", self.polling.down),
            ("job", self.polling.job),
        ] {
            if policy.timeout_minutes == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "polling.{}.timeout_minutes は 1 以上にしてください",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn operation_timeouts(&self) -> OperationTimeouts {
        self.timeouts.to_operation_timeouts()
    }

    pub fn poll_policies(&self) -> PollPolicies {
        let defaults = PollPolicies::default();
        PollPolicies {
            readiness: self.polling.readiness.apply(defaults.readiness),
            down: self.polling.down.apply(defaults.down),
            job: self.polling.job.apply(defaults.job),
        }
    }
}

/// 操作全体のタイムアウト (分)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_create_minutes")]
    pub create_minutes: u64,
    #[serde(default = "default_read_minutes")]
    pub read_minutes: u64,
    #[serde(default = "default_update_minutes")]
    pub update_minutes: u64,
    #[serde(default = "default_delete_minutes")]
    pub delete_minutes: u64,
    #[serde(default = "default_subnet_delete_minutes")]
    pub subnet_delete_minutes: u64,
}

fn default_create_minutes() -> u64 {
    60
}

fn default_read_minutes() -> u64 {
    5
}

fn default_update_minutes() -> u64 {
    60
}

fn default_delete_minutes() -> u64 {
    20
}

fn default_subnet_delete_minutes() -> u64 {
    5
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            create_minutes: default_create_minutes(),
            read_minutes: default_read_minutes(),
            update_minutes: default_update_minutes(),
            delete_minutes: default_delete_minutes(),
            subnet_delete_minutes: default_subnet_delete_minutes(),
        }
    }
}

impl TimeoutSettings {
    fn validate(&self) -> Result<()> {
        let all = [
            ("create_minutes", self.create_minutes),
            ("read_minutes", self.read_minutes),
            ("update_minutes", self.update_minutes),
            ("delete_minutes", self.delete_minutes),
            ("subnet_delete_minutes", self.subnet_delete_minutes),
        ];
        if let Some((name, _)) = all.iter().find(|(_, minutes)| *minutes == 0) {
            return Err(ConfigError::Invalid(format!(
                "timeouts.{} は 1 以上にしてください",
                name
            )));
        }
        Ok(())
    }

    pub fn to_operation_timeouts(&self) -> OperationTimeouts {
        OperationTimeouts {
            create: minutes(self.create_minutes),
            read: minutes(self.read_minutes),
            update: minutes(self.update_minutes),
            delete: minutes(self.delete_minutes),
            subnet_delete: minutes(self.subnet_delete_minutes),
        }
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default)]
    pub readiness: PollOverride,
    #[serde(default)]
    pub down: PollOverride,
    #[serde(default)]
    pub job: PollOverride,
}

/// 既定のポーリング設定を部分的に上書きする
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_sleep_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_sleep_secs: Option<u64>,
}

impl PollOverride {
    pub fn apply(&self, base: PollPolicy) -> PollPolicy {
        PollPolicy {
            timeout: self.timeout_minutes.map(minutes).unwrap_or(base.timeout),
            error_threshold: self.error_threshold.unwrap_or(base.error_threshold),
            error_sleep: self
                .error_sleep_secs
                .map(Duration::from_secs)
                .unwrap_or(base.error_sleep),
            pending_sleep: self
                .pending_sleep_secs
                .map(Duration::from_secs)
                .unwrap_or(base.pending_sleep),
        }
    }
}
