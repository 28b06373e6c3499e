//! Provisioning 外部系统接口
//!
//! 实际授予/回收访问权限的外部系统。任何错误对生命周期都是致命的，
//! 本接口不负责重试。

use async_trait::async_trait;
use permit_common::SubjectId;
use permit_errors::AppResult;

#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// 在目标应用中授予权限
    async fn grant(
        &self,
        subject: &SubjectId,
        application_name: &str,
        permission_level: &str,
        expiry_seconds: u64,
    ) -> AppResult<()>;

    /// 在目标应用中回收权限
    async fn revoke(&self, subject: &SubjectId, application_name: &str) -> AppResult<()>;
}
