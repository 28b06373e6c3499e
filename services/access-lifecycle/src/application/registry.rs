//! 生命周期注册表
//!
//! 按员工 ID 管理所有运行中的生命周期。同一员工同一时间只有一个运行中的生命周期；
//! 已停止或失败的可以重新启动，启动时从日志恢复。

use std::collections::HashMap;

use permit_common::SubjectId;
use permit_errors::{AppError, AppResult};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use super::lifecycle::{LifecycleDeps, LifecycleHandle, LifecycleStatus};
use crate::error::LifecycleError;

/// 生命周期概要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleSummary {
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub status: LifecycleStatus,
}

pub struct LifecycleRegistry {
    deps: LifecycleDeps,
    lifecycles: RwLock<HashMap<SubjectId, LifecycleHandle>>,
}

impl LifecycleRegistry {
    pub fn new(deps: LifecycleDeps) -> Self {
        Self {
            deps,
            lifecycles: RwLock::new(HashMap::new()),
        }
    }

    /// 启动生命周期，未指定 ID 时生成一个
    pub async fn start(&self, subject: Option<SubjectId>) -> AppResult<LifecycleHandle> {
        let mut lifecycles = self.lifecycles.write().await;

        let subject = match subject {
            Some(subject) => {
                subject.validate().map_err(AppError::validation)?;
                if lifecycles.get(&subject).is_some_and(|h| h.is_running()) {
                    return Err(LifecycleError::AlreadyRunning(subject).into());
                }
                subject
            }
            None => loop {
                let candidate = SubjectId::generate();
                if !lifecycles.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let handle = LifecycleHandle::spawn(subject.clone(), self.deps.clone()).await?;
        lifecycles.insert(subject, handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, subject: &SubjectId) -> AppResult<LifecycleHandle> {
        self.lifecycles
            .read()
            .await
            .get(subject)
            .cloned()
            .ok_or_else(|| LifecycleError::SubjectNotFound(subject.clone()).into())
    }

    /// 运行中的生命周期数量，与 `lifecycles_active` gauge 一致
    pub fn active_count(&self) -> usize {
        self.deps.active.get()
    }

    /// 所有生命周期，按 ID 排序
    pub async fn list(&self) -> Vec<LifecycleSummary> {
        let lifecycles = self.lifecycles.read().await;
        let mut summaries: Vec<_> = lifecycles
            .iter()
            .map(|(subject, handle)| LifecycleSummary {
                subject_id: subject.clone(),
                status: handle.status(),
            })
            .collect();
        summaries.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        summaries
    }

    /// 为日志中所有尚未启动的主体恢复生命周期，返回恢复数量
    pub async fn resume_all(&self) -> AppResult<usize> {
        let mut resumed = 0;
        for subject in self.deps.journal.subjects().await? {
            if self.lifecycles.read().await.contains_key(&subject) {
                continue;
            }
            self.start(Some(subject)).await?;
            resumed += 1;
        }

        if resumed > 0 {
            info!(count = resumed, "Lifecycles resumed from journal");
        }
        Ok(resumed)
    }

    /// 停止所有生命周期
    pub async fn shutdown(&self) {
        let lifecycles = self.lifecycles.read().await;
        for handle in lifecycles.values() {
            handle.shutdown().await;
        }
        info!(count = lifecycles.len(), "All lifecycles stopped");
    }
}
