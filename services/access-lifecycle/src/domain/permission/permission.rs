//! 应用权限实体

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 权限状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Active,
    Expired,
}

/// 单个应用的权限
///
/// `expiry` 为零表示永不过期。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPermission {
    pub application_name: String,
    pub permission_level: String,
    #[serde(rename = "expiry_seconds", with = "duration_secs")]
    pub expiry: Duration,
    pub status: PermissionStatus,
}

impl ApplicationPermission {
    /// 新授予的权限，状态为 Active
    pub fn active(
        application_name: impl Into<String>,
        permission_level: impl Into<String>,
        expiry: Duration,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            permission_level: permission_level.into(),
            expiry,
            status: PermissionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PermissionStatus::Active
    }

    pub fn has_expiry(&self) -> bool {
        !self.expiry.is_zero()
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry.as_secs()
    }

    /// 标记为 Expired 的副本（用于 revoke 事件）
    pub fn expired(&self) -> Self {
        Self {
            status: PermissionStatus::Expired,
            ..self.clone()
        }
    }

    /// 到期事件携带的权限快照：保留级别，清零有效期
    pub fn expiry_marker(&self) -> Self {
        Self {
            application_name: self.application_name.clone(),
            permission_level: self.permission_level.clone(),
            expiry: Duration::ZERO,
            status: PermissionStatus::Expired,
        }
    }
}

/// ApplicationName -> ApplicationPermission
pub type PermissionTable = HashMap<String, ApplicationPermission>;

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
