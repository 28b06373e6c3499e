//! 集成测试公共工具

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use access_lifecycle::application::{LifecycleDeps, LifecycleHandle, LifecycleSettings};
use access_lifecycle::domain::{Clock, EventJournal, ProvisioningService, SignalEvent};
use access_lifecycle::infrastructure::journal::InMemoryEventJournal;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use permit_common::SubjectId;
use permit_errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Grant {
        application_name: String,
        permission_level: String,
        expiry_seconds: u64,
    },
    Revoke {
        application_name: String,
    },
}

/// 记录所有调用，可以让指定应用的调用失败
#[derive(Default)]
pub struct RecordingProvisioning {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingProvisioning {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, application_name: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(application_name.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn revokes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Revoke { .. }))
            .count()
    }

    fn check(&self, application_name: &str) -> AppResult<()> {
        if self.failing.lock().unwrap().contains(application_name) {
            return Err(AppError::external_service(format!(
                "{application_name} rejected the request"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProvisioningService for RecordingProvisioning {
    async fn grant(
        &self,
        _subject: &SubjectId,
        application_name: &str,
        permission_level: &str,
        expiry_seconds: u64,
    ) -> AppResult<()> {
        self.calls.lock().unwrap().push(Call::Grant {
            application_name: application_name.to_string(),
            permission_level: permission_level.to_string(),
            expiry_seconds,
        });
        self.check(application_name)
    }

    async fn revoke(&self, _subject: &SubjectId, application_name: &str) -> AppResult<()> {
        self.calls.lock().unwrap().push(Call::Revoke {
            application_name: application_name.to_string(),
        });
        self.check(application_name)
    }
}

/// 手动推进的时钟
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn deps(
    provisioning: Arc<RecordingProvisioning>,
    journal: Arc<dyn EventJournal>,
    clock: Arc<dyn Clock>,
) -> LifecycleDeps {
    LifecycleDeps {
        provisioning,
        journal,
        clock,
        settings: LifecycleSettings::default(),
        active: Arc::default(),
    }
}

pub fn memory_deps(provisioning: Arc<RecordingProvisioning>) -> LifecycleDeps {
    deps(
        provisioning,
        Arc::new(InMemoryEventJournal::new()),
        ManualClock::new(),
    )
}

pub fn subject() -> SubjectId {
    SubjectId::from("employee-424242")
}

/// 等待历史达到指定长度
pub async fn wait_for_history(handle: &LifecycleHandle, len: usize) -> Vec<SignalEvent> {
    for _ in 0..200 {
        let history = handle.get_history().await;
        if history.len() >= len {
            return history;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("history never reached {len} events");
}

/// 让已发出的命令全部处理完
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
