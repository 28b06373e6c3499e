//! 权限账本
//!
//! 当前权限表 + 历史的纯状态机。只依赖已处理的事件序列，
//! 不读时钟、不做 I/O，因此按相同顺序回放日志可以得到完全相同的状态。

use super::events::{SignalEvent, SignalKind};
use super::history::History;
use super::permission::{ApplicationPermission, PermissionTable};

/// 单个应用的隐式状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Absent,
    Active,
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionLedger {
    permissions: PermissionTable,
    history: History,
}

impl PermissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序重放事件重建状态
    pub fn replay<I>(events: I) -> Self
    where
        I: IntoIterator<Item = SignalEvent>,
    {
        events.into_iter().fold(Self::new(), |mut ledger, event| {
            ledger.apply(event);
            ledger
        })
    }

    /// 提交一个已完成的状态迁移
    ///
    /// - Grant：写入（覆盖）权限
    /// - Revoke：删除表项
    /// - Expire：表项保留，替换为到期标记（级别不变，有效期为零，状态 Expired）
    pub fn apply(&mut self, event: SignalEvent) {
        let app = event.application_name().to_string();

        match event.kind {
            SignalKind::Grant => {
                self.permissions.insert(app, event.permission.clone());
            }
            SignalKind::Revoke => {
                self.permissions.remove(&app);
            }
            SignalKind::Expire => {
                self.permissions.insert(app, event.permission.clone());
            }
        }

        self.history.append(event);
    }

    pub fn permission(&self, application_name: &str) -> Option<&ApplicationPermission> {
        self.permissions.get(application_name)
    }

    pub fn state_of(&self, application_name: &str) -> PermissionState {
        match self.permissions.get(application_name) {
            None => PermissionState::Absent,
            Some(p) if p.is_active() => PermissionState::Active,
            Some(_) => PermissionState::Expired,
        }
    }

    /// 当前权限表快照
    pub fn access(&self) -> PermissionTable {
        self.permissions.clone()
    }

    /// 历史快照
    pub fn history(&self) -> Vec<SignalEvent> {
        self.history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
