//! 服务启动器
//!
//! 提供统一的 HTTP 服务启动模式

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::Router;
use permit_config::AppConfig;
use permit_errors::AppResult;
use permit_telemetry::init_metrics;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::health::health_routes;
use crate::runtime::{init_runtime, shutdown_signal};

type ShutdownHook = Pin<Box<dyn Future<Output = ()> + Send>>;

/// 服务构建结果：业务路由和关闭时的清理逻辑
pub struct Service {
    router: Router,
    on_shutdown: Option<ShutdownHook>,
}

impl Service {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            on_shutdown: None,
        }
    }

    /// HTTP 服务停止后执行
    pub fn on_shutdown<F>(mut self, hook: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.on_shutdown = Some(Box::pin(hook));
        self
    }
}

/// 运行 HTTP 服务
///
/// 1. 加载配置
/// 2. 初始化运行时（日志）和 Prometheus recorder
/// 3. 调用用户提供的闭包构建服务
/// 4. 合并 `/health`、`/metrics` 路由并启动服务器
/// 5. 收到关闭信号后停止接收请求，执行清理
///
/// # 示例
///
/// ```ignore
/// use permit_bootstrap::{Service, run};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run("config", |config| async move {
///         Ok(Service::new(my_routes(&config)))
///     }).await
/// }
/// ```
pub async fn run<F, Fut>(config_dir: &str, service_builder: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = AppResult<Service>>,
{
    // 1. 加载配置
    let config = AppConfig::load(config_dir)?;

    // 2. 初始化运行时
    init_runtime(&config);

    info!("Starting {} service", config.app_name);

    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed, /metrics disabled");
            None
        }
    };

    // 3. 构建服务
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let service = service_builder(config).await?;

    // 4. 启动服务器
    let app = service
        .router
        .merge(health_routes(metrics))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 5. 清理
    if let Some(hook) = service.on_shutdown {
        hook.await;
    }

    info!("Service stopped");

    Ok(())
}
