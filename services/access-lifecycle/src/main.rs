//! Access Lifecycle Service - 服务入口

use std::sync::Arc;

use access_lifecycle::api::lifecycle_routes;
use access_lifecycle::application::{LifecycleDeps, LifecycleRegistry, LifecycleSettings};
use access_lifecycle::domain::SystemClock;
use access_lifecycle::infrastructure::journal::build_journal;
use access_lifecycle::infrastructure::provisioning::build_provisioning;
use permit_bootstrap::{Service, run};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    run("config", |config| async move {
        info!("Initializing Access Lifecycle Service...");

        let deps = LifecycleDeps {
            provisioning: build_provisioning(&config.provisioning)?,
            journal: build_journal(&config.journal).await?,
            clock: Arc::new(SystemClock),
            settings: LifecycleSettings::from(&config.lifecycle),
            active: Arc::default(),
        };

        let registry = Arc::new(LifecycleRegistry::new(deps));
        registry.resume_all().await?;

        let router = lifecycle_routes(registry.clone());
        Ok(Service::new(router).on_shutdown(async move {
            registry.shutdown().await;
        }))
    })
    .await
}
