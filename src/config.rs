//! Layered configuration for bkpost.
//!
//! Values are resolved in order: built-in defaults, the TOML config file,
//! `BKPOST_` environment variables (`__` separates nested keys), then CLI
//! overrides. The resolved config is read-only for the rest of the run.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/bkpost/config.toml";

/// Free space (MB) at or below which local backups are refused.
pub const DEFAULT_FILE_SIZE_ERROR: u64 = 512;
/// Free space (MB) at or below which a warning is logged.
pub const DEFAULT_FILE_SIZE_WARNING: u64 = 1024;
pub const DEFAULT_GRACE_DELAY_SECS: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: bool,
    pub verbose: bool,
    pub json_logs: bool,
    pub backup: BackupConfig,
    pub storage: StorageConfig,
    pub mount: MountOptions,
    pub host: HostConfig,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// Resolve the configuration, merging `cli_overrides` last.
    ///
    /// A missing config file is not an error; defaults apply.
    pub fn new<T: Serialize>(
        config_path: Option<&Path>,
        cli_overrides: Option<&T>,
    ) -> Result<Self> {
        let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("BKPOST_").split("__"));

        if let Some(overrides) = cli_overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Job name used in notifications and logs.
    pub name: String,
    /// Optional shell command performing the actual transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            name: "backup".to_string(),
            command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub file_size_error: u64,
    pub file_size_warning: u64,
    /// Backups go to network storage, so local free space never blocks them.
    pub nas_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_size_error: DEFAULT_FILE_SIZE_ERROR,
            file_size_warning: DEFAULT_FILE_SIZE_WARNING,
            nas_enabled: false,
        }
    }
}

impl StorageConfig {
    /// Error threshold in MB; zero means "unset".
    pub fn error_threshold(&self) -> u64 {
        match self.file_size_error {
            0 => DEFAULT_FILE_SIZE_ERROR,
            v => v,
        }
    }

    /// Warning threshold in MB; zero means "unset".
    pub fn warning_threshold(&self) -> u64 {
        match self.file_size_warning {
            0 => DEFAULT_FILE_SIZE_WARNING,
            v => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MountType {
    Cifs,
    Nfs,
    #[default]
    None,
}

impl MountType {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Cifs | Self::Nfs)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cifs => "CIFS",
            Self::Nfs => "NFS",
            Self::None => "none",
        }
    }
}

impl From<String> for MountType {
    /// Only the exact `CIFS` and `NFS` spellings select a network share.
    fn from(s: String) -> Self {
        match s.as_str() {
            "CIFS" => Self::Cifs,
            "NFS" => Self::Nfs,
            _ => Self::None,
        }
    }
}

impl From<MountType> for String {
    fn from(t: MountType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for MountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountOptions {
    /// Mount point of the network share.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    pub mount_type: MountType,
    /// Path handed to `umount`.
    pub backup_dir: PathBuf,
    pub grace_delay_secs: u64,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            mount: None,
            mount_type: MountType::None,
            backup_dir: PathBuf::from("/opt/bkpost/backups"),
            grace_delay_secs: DEFAULT_GRACE_DELAY_SECS,
        }
    }
}

impl MountOptions {
    pub fn grace_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.grace_delay_secs)
    }
}

/// Where host identity, metrics and the message transport come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Adapter name used to look up `system.adapter.<name>.<instance>`.
    pub adapter_name: String,
    pub instance: u32,
    /// Host runtime JSON-RPC endpoint. Without it the local machine is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_addr: Option<SocketAddr>,
    /// Filesystem reported as `diskFree` by the local registry.
    pub local_path: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            adapter_name: "bkpost".to_string(),
            instance: 0,
            rpc_addr: None,
            local_path: PathBuf::from("/"),
        }
    }
}

impl HostConfig {
    pub fn instance_object_id(&self) -> String {
        format!("system.adapter.{}.{}", self.adapter_name, self.instance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationProvider {
    #[default]
    None,
    Telegram,
    Email,
    Pushover,
    WhatsApp,
    Signal,
    Matrix,
    Discord,
    /// A provider key this build does not know; dispatch ignores it.
    Unsupported(String),
}

impl From<String> for NotificationProvider {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "" | "none" => Self::None,
            "telegram" => Self::Telegram,
            "email" | "e-mail" => Self::Email,
            "pushover" => Self::Pushover,
            "whatsapp" => Self::WhatsApp,
            "signal" => Self::Signal,
            "matrix" => Self::Matrix,
            "discord" => Self::Discord,
            _ => Self::Unsupported(s),
        }
    }
}

impl NotificationProvider {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Telegram => "telegram",
            Self::Email => "email",
            Self::Pushover => "pushover",
            Self::WhatsApp => "whatsapp",
            Self::Signal => "signal",
            Self::Matrix => "matrix",
            Self::Discord => "discord",
            Self::Unsupported(s) => s,
        }
    }
}

impl From<NotificationProvider> for String {
    fn from(p: NotificationProvider) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for NotificationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub provider: NotificationProvider,
    /// Prefix line of every message; also the e-mail subject and Pushover title.
    pub title: String,
    pub telegram: TelegramConfig,
    pub email: EmailConfig,
    pub pushover: PushoverConfig,
    pub whatsapp: InstanceOnlyConfig,
    pub signal: InstanceOnlyConfig,
    pub matrix: InstanceOnlyConfig,
    pub discord: DiscordConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: NotificationProvider::None,
            title: "Backup".to_string(),
            telegram: TelegramConfig::default(),
            email: EmailConfig::default(),
            pushover: PushoverConfig::default(),
            whatsapp: InstanceOnlyConfig::default(),
            signal: InstanceOnlyConfig::default(),
            matrix: InstanceOnlyConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Recipient user, or `allTelegramUsers` to broadcast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(deserialize_with = "bool_or_string")]
    pub silent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushoverConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(deserialize_with = "bool_or_string")]
    pub silent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceOnlyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// `<userId>` or `<serverId>/<channelId>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Accept `true`/`false` or their string forms.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::Str(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}

/// Non-empty value of an optional config string.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
