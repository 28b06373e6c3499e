//! permit-telemetry - 日志与 metrics 初始化

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读，开发环境
    Pretty,
    /// 每行一个 JSON 对象，供日志采集
    Json,
}

impl LogFormat {
    /// 生产环境或显式开启 `telemetry.json` 时使用 JSON
    pub fn select(production: bool, json: bool) -> Self {
        if production || json {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// `RUST_LOG` 优先，未设置或无法解析时使用配置的级别
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// 安装全局 tracing subscriber，只能调用一次
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter(log_level));

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}

/// 安装 Prometheus recorder
///
/// 全局 recorder 只能安装一次，重复调用返回错误
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
