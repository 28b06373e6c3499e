//! Provisioning 实现

mod http;
mod simulated;

use std::sync::Arc;

use permit_config::{ProvisioningConfig, ProvisioningMode};
use permit_errors::{AppError, AppResult};
use tracing::info;

pub use http::HttpProvisioning;
pub use simulated::SimulatedProvisioning;

use crate::domain::ProvisioningService;

/// 根据配置创建 provisioning 实现
pub fn build_provisioning(config: &ProvisioningConfig) -> AppResult<Arc<dyn ProvisioningService>> {
    match config.mode {
        ProvisioningMode::Simulated => {
            info!(
                latency_ms = config.simulated_latency_ms,
                "Using simulated provisioning"
            );
            Ok(Arc::new(SimulatedProvisioning::new(config.simulated_latency())))
        }
        ProvisioningMode::Http => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                AppError::validation("provisioning.endpoint is required in http mode")
            })?;
            info!(endpoint = %endpoint, "Using HTTP provisioning");
            Ok(Arc::new(HttpProvisioning::new(
                endpoint,
                config.api_token.clone(),
            )?))
        }
    }
}
