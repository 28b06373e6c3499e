//! 权限信号事件

use serde::{Deserialize, Serialize};

use super::permission::ApplicationPermission;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Grant,
    Revoke,
    /// 定时器到期产生的内部事件
    Expire,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Grant => "grant",
            SignalKind::Revoke => "revoke",
            SignalKind::Expire => "expire",
        }
    }
}

/// 入队时的权限快照，入队后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub kind: SignalKind,
    pub permission: ApplicationPermission,
}

impl SignalEvent {
    pub fn grant(permission: ApplicationPermission) -> Self {
        Self {
            kind: SignalKind::Grant,
            permission,
        }
    }

    pub fn revoke(permission: ApplicationPermission) -> Self {
        Self {
            kind: SignalKind::Revoke,
            permission,
        }
    }

    pub fn expire(permission: ApplicationPermission) -> Self {
        Self {
            kind: SignalKind::Expire,
            permission,
        }
    }

    pub fn application_name(&self) -> &str {
        &self.permission.application_name
    }
}
