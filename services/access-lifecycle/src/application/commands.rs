//! 权限命令定义

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ApplicationPermission;

const NAME_MAX_LEN: usize = 200;

/// 有效期上限：10 年
pub const MAX_EXPIRY_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// 授予权限命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantCommand {
    pub application_name: String,
    pub permission_level: String,
    /// 0 表示永不过期
    #[serde(default)]
    pub expiry_seconds: u64,
}

impl GrantCommand {
    pub fn new(
        application_name: impl Into<String>,
        permission_level: impl Into<String>,
        expiry_seconds: u64,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            permission_level: permission_level.into(),
            expiry_seconds,
        }
    }

    /// 验证命令参数
    pub fn validate(&self) -> Result<(), String> {
        validate_application_name(&self.application_name)?;
        if self.permission_level.trim().is_empty() {
            return Err("Permission level cannot be empty".to_string());
        }
        if self.permission_level.len() > NAME_MAX_LEN {
            return Err(format!(
                "Permission level cannot exceed {} characters",
                NAME_MAX_LEN
            ));
        }
        if self.expiry_seconds > MAX_EXPIRY_SECONDS {
            return Err(format!(
                "Expiry cannot exceed {} seconds",
                MAX_EXPIRY_SECONDS
            ));
        }
        Ok(())
    }

    /// 转换为 Active 权限
    pub fn into_permission(self) -> ApplicationPermission {
        ApplicationPermission::active(
            self.application_name,
            self.permission_level,
            Duration::from_secs(self.expiry_seconds),
        )
    }
}

/// 回收权限命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeCommand {
    pub application_name: String,
}

impl RevokeCommand {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_application_name(&self.application_name)
    }
}

fn validate_application_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Application name cannot be empty".to_string());
    }
    if name.len() > NAME_MAX_LEN {
        return Err(format!(
            "Application name cannot exceed {} characters",
            NAME_MAX_LEN
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("Application name cannot contain control characters".to_string());
    }
    Ok(())
}
