//! 事件日志
//!
//! 每个已处理事件在对查询可见之前先写入日志。恢复时按序重放日志，
//! 并根据授予时间重新计算仍在生效的到期定时器。

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use permit_common::{SubjectId, new_id};
use permit_errors::AppResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permission::{ApplicationPermission, SignalEvent, SignalKind};

/// 日志条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    /// 处理顺序，从 0 开始连续递增
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: SignalEvent,
}

impl JournalEntry {
    pub fn new(sequence: u64, recorded_at: DateTime<Utc>, event: SignalEvent) -> Self {
        Self {
            id: new_id(),
            sequence,
            recorded_at,
            event,
        }
    }
}

/// 事件日志接口
#[async_trait]
pub trait EventJournal: Send + Sync {
    /// 追加条目
    async fn append(&self, subject: &SubjectId, entry: &JournalEntry) -> AppResult<()>;

    /// 按序读取某个主体的全部条目
    async fn load(&self, subject: &SubjectId) -> AppResult<Vec<JournalEntry>>;

    /// 所有有日志的主体
    async fn subjects(&self) -> AppResult<Vec<SubjectId>>;
}

/// 恢复时需要重新挂起的到期定时器
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExpiry {
    pub permission: ApplicationPermission,
    pub deadline: DateTime<Utc>,
}

impl PendingExpiry {
    /// 距离到期的剩余时间，已过期返回零
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// 从日志中找出仍处于 Active 且带有效期的权限
pub fn pending_expiries(entries: &[JournalEntry]) -> Vec<PendingExpiry> {
    let mut pending: BTreeMap<String, PendingExpiry> = BTreeMap::new();

    for entry in entries {
        let app = entry.event.application_name().to_string();
        match entry.event.kind {
            SignalKind::Grant if entry.event.permission.has_expiry() => {
                let deadline = chrono::Duration::from_std(entry.event.permission.expiry)
                    .ok()
                    .and_then(|expiry| entry.recorded_at.checked_add_signed(expiry))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                pending.insert(
                    app,
                    PendingExpiry {
                        permission: entry.event.permission.clone(),
                        deadline,
                    },
                );
            }
            SignalKind::Grant | SignalKind::Revoke | SignalKind::Expire => {
                pending.remove(&app);
            }
        }
    }

    pending.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn grant(app: &str, secs: u64) -> SignalEvent {
        SignalEvent::grant(ApplicationPermission::active(
            app,
            "User",
            Duration::from_secs(secs),
        ))
    }

    #[test]
    fn test_pending_expiries() {
        let office = grant("Office365", 30);
        let office_marker = office.permission.expiry_marker();
        let slack = grant("Slack", 10);
        let slack_revoked = slack.permission.expired();

        let entries = vec![
            JournalEntry::new(0, at(0), office),
            JournalEntry::new(1, at(1), slack),
            JournalEntry::new(2, at(2), grant("Jira", 20)),
            JournalEntry::new(3, at(3), SignalEvent::revoke(slack_revoked)),
            JournalEntry::new(4, at(4), grant("Salesforce", 0)),
            JournalEntry::new(5, at(30), SignalEvent::expire(office_marker)),
        ];

        let pending = pending_expiries(&entries);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].permission.application_name, "Jira");
        assert_eq!(pending[0].deadline, at(22));
    }

    #[test]
    fn test_regrant_without_expiry_clears_pending() {
        let entries = vec![
            JournalEntry::new(0, at(0), grant("Jira", 20)),
            JournalEntry::new(1, at(5), grant("Jira", 0)),
        ];

        assert!(pending_expiries(&entries).is_empty());
    }

    #[test]
    fn test_remaining() {
        let pending = PendingExpiry {
            permission: ApplicationPermission::active("Jira", "User", Duration::from_secs(20)),
            deadline: at(20),
        };

        assert_eq!(pending.remaining(at(5)), Duration::from_secs(15));
        assert_eq!(pending.remaining(at(25)), Duration::ZERO);
    }
}
