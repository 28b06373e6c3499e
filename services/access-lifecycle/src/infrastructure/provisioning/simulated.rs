//! 模拟 provisioning
//!
//! 不连接任何外部系统，记录日志并等待一段固定延迟。

use std::time::Duration;

use async_trait::async_trait;
use permit_common::SubjectId;
use permit_errors::AppResult;
use tracing::info;

use crate::domain::ProvisioningService;

#[derive(Debug, Clone)]
pub struct SimulatedProvisioning {
    latency: Duration,
}

impl SimulatedProvisioning {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl ProvisioningService for SimulatedProvisioning {
    async fn grant(
        &self,
        subject: &SubjectId,
        application_name: &str,
        permission_level: &str,
        expiry_seconds: u64,
    ) -> AppResult<()> {
        info!(
            subject_id = %subject,
            application_name,
            permission_level,
            expiry_seconds,
            "Provisioning access"
        );
        tokio::time::sleep(self.latency).await;
        Ok(())
    }

    async fn revoke(&self, subject: &SubjectId, application_name: &str) -> AppResult<()> {
        info!(subject_id = %subject, application_name, "Revoking access");
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}
