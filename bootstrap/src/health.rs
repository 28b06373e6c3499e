//! 健康检查模块
//!
//! 提供 /health 和 /metrics 端点

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Clone)]
struct HealthState {
    metrics: Option<PrometheusHandle>,
}

/// 健康检查与 metrics 路由
///
/// 未安装 Prometheus recorder 时 `/metrics` 返回 404
pub fn health_routes<S>(metrics: Option<PrometheusHandle>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(HealthState { metrics })
}

/// Liveness 端点处理器
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::healthy()))
}

/// Metrics 端点处理器
async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
