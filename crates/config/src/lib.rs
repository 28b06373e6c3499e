//! permit-config - 配置加载库

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 权限生命周期配置
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// 事件队列容量，满时生产者等待
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// grant / revoke 命令入口缓冲大小
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// 单次 provisioning 调用超时（秒）
    #[serde(default = "default_provisioning_timeout_secs")]
    pub provisioning_timeout_secs: u64,
}

fn default_queue_capacity() -> usize {
    100
}

fn default_command_buffer() -> usize {
    32
}

fn default_provisioning_timeout_secs() -> u64 {
    60
}

impl LifecycleConfig {
    pub fn provisioning_timeout(&self) -> Duration {
        Duration::from_secs(self.provisioning_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            command_buffer: default_command_buffer(),
            provisioning_timeout_secs: default_provisioning_timeout_secs(),
        }
    }
}

/// Provisioning 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningMode {
    /// 仅记录日志并模拟延迟
    #[default]
    Simulated,
    /// 调用外部 HTTP 接口
    Http,
}

/// Provisioning 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default)]
    pub mode: ProvisioningMode,
    pub endpoint: Option<String>,
    pub api_token: Option<Secret<String>>,
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

fn default_simulated_latency_ms() -> u64 {
    2000
}

impl ProvisioningConfig {
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            mode: ProvisioningMode::default(),
            endpoint: None,
            api_token: None,
            simulated_latency_ms: default_simulated_latency_ms(),
        }
    }
}

/// 事件日志配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalConfig {
    /// JSONL 文件目录，未配置时使用内存日志
    pub dir: Option<String>,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级：`APP_` 前缀环境变量 > `{APP_ENV}.toml` > `default.toml`
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("APP_").split("__"))
            .join(("app_env", env))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
