//! 生命周期句柄
//!
//! 每个员工一个生命周期：一个信号接收任务和一个控制器任务。
//! 句柄是对外的唯一入口，可以克隆，所有克隆共享同一个生命周期。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::gauge;
use permit_common::SubjectId;
use permit_config::LifecycleConfig;
use permit_errors::{AppError, AppResult};
use serde::Serialize;
use tokio::sync::{RwLock, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::controller::LifecycleController;
use super::ingestor::SignalIngestor;
use super::queue::event_queue;
use super::timer::ExpiryTimerManager;
use crate::application::commands::{GrantCommand, RevokeCommand};
use crate::domain::{
    Clock, EventJournal, PermissionLedger, PermissionTable, ProvisioningService, SignalEvent,
    pending_expiries,
};
use crate::error::LifecycleError;

/// 生命周期运行状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LifecycleStatus {
    Running,
    Stopped,
    /// 因 provisioning 或日志错误终止
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub queue_capacity: usize,
    pub command_buffer: usize,
    pub provisioning_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from(&LifecycleConfig::default())
    }
}

impl From<&LifecycleConfig> for LifecycleSettings {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            command_buffer: config.command_buffer,
            provisioning_timeout: config.provisioning_timeout(),
        }
    }
}

/// 运行中的生命周期数量，同步到 `lifecycles_active` gauge
#[derive(Debug, Default)]
pub struct ActiveLifecycles {
    count: AtomicUsize,
}

impl ActiveLifecycles {
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn started(&self) {
        let active = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("lifecycles_active").set(active as f64);
    }

    fn ended(&self) {
        let active = self.count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        gauge!("lifecycles_active").set(active as f64);
    }
}

/// 生命周期依赖
#[derive(Clone)]
pub struct LifecycleDeps {
    pub provisioning: Arc<dyn ProvisioningService>,
    pub journal: Arc<dyn EventJournal>,
    pub clock: Arc<dyn Clock>,
    pub settings: LifecycleSettings,
    /// 同一组依赖启动的生命周期共享计数
    pub active: Arc<ActiveLifecycles>,
}

#[derive(Clone, Debug)]
pub struct LifecycleHandle {
    subject: SubjectId,
    grants: mpsc::Sender<GrantCommand>,
    revokes: mpsc::Sender<RevokeCommand>,
    ledger: Arc<RwLock<PermissionLedger>>,
    status: watch::Receiver<LifecycleStatus>,
    cancel: CancellationToken,
}

impl LifecycleHandle {
    /// 启动生命周期
    ///
    /// 日志中已有该主体的记录时先重放恢复权限表和历史，
    /// 再为仍在生效的限时权限重新挂起定时器。
    pub async fn spawn(subject: SubjectId, deps: LifecycleDeps) -> AppResult<Self> {
        let entries = deps.journal.load(&subject).await?;
        let pending = pending_expiries(&entries);
        let next_sequence = entries.len() as u64;
        if !entries.is_empty() {
            info!(
                subject_id = %subject,
                events = entries.len(),
                pending_expiries = pending.len(),
                "Resuming lifecycle from journal"
            );
        }
        let ledger = Arc::new(RwLock::new(PermissionLedger::replay(
            entries.into_iter().map(|entry| entry.event),
        )));

        let settings = &deps.settings;
        let (queue_tx, queue_rx) = event_queue(settings.queue_capacity);
        let (grants, grant_rx) = mpsc::channel(settings.command_buffer.max(1));
        let (revokes, revoke_rx) = mpsc::channel(settings.command_buffer.max(1));

        let ingestor = SignalIngestor::new(
            subject.clone(),
            grant_rx,
            revoke_rx,
            ledger.clone(),
            queue_tx.clone(),
        );
        let mut controller = LifecycleController::new(
            subject.clone(),
            ledger.clone(),
            queue_rx,
            ExpiryTimerManager::new(queue_tx),
            &deps,
            next_sequence,
        );
        controller.restore_timers(pending);

        let cancel = CancellationToken::new();
        let (status_tx, status) = watch::channel(LifecycleStatus::Running);

        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = ingestor.run() => {}
            }
        });

        let token = cancel.clone();
        let id = subject.clone();
        let active = deps.active.clone();
        active.started();
        tokio::spawn(async move {
            let final_status = tokio::select! {
                _ = token.cancelled() => LifecycleStatus::Stopped,
                result = controller.run() => match result {
                    Ok(()) => LifecycleStatus::Stopped,
                    Err(e) => {
                        error!(subject_id = %id, error = %e, "Lifecycle terminated");
                        LifecycleStatus::Failed { error: e.to_string() }
                    }
                },
            };
            token.cancel();
            active.ended();
            info!(subject_id = %id, status = ?final_status, "Lifecycle stopped");
            let _ = status_tx.send(final_status);
        });

        info!(subject_id = %subject, "Lifecycle started");
        Ok(Self {
            subject,
            grants,
            revokes,
            ledger,
            status,
            cancel,
        })
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// 提交授予命令，处理是异步的
    pub async fn grant(&self, command: GrantCommand) -> AppResult<()> {
        command.validate().map_err(AppError::validation)?;
        self.ensure_running()?;
        self.grants
            .send(command)
            .await
            .map_err(|_| LifecycleError::Terminated(self.subject.clone()))?;
        Ok(())
    }

    /// 提交回收命令，应用不在权限表中时会被静默丢弃
    pub async fn revoke(&self, command: RevokeCommand) -> AppResult<()> {
        command.validate().map_err(AppError::validation)?;
        self.ensure_running()?;
        self.revokes
            .send(command)
            .await
            .map_err(|_| LifecycleError::Terminated(self.subject.clone()))?;
        Ok(())
    }

    /// 当前权限表快照
    pub async fn get_access(&self) -> PermissionTable {
        self.ledger.read().await.access()
    }

    /// 已处理事件的历史快照，按处理顺序
    pub async fn get_history(&self) -> Vec<SignalEvent> {
        self.ledger.read().await.history()
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        *self.status.borrow() == LifecycleStatus::Running
    }

    /// 等待生命周期结束并返回最终状态
    pub async fn terminated(&self) -> LifecycleStatus {
        let mut status = self.status.clone();
        let result = status
            .wait_for(|s| *s != LifecycleStatus::Running)
            .await
            .map(|s| s.clone());
        result.unwrap_or(LifecycleStatus::Stopped)
    }

    /// 停止生命周期，未处理的命令和事件被丢弃
    pub async fn shutdown(&self) -> LifecycleStatus {
        self.cancel.cancel();
        self.terminated().await
    }

    fn ensure_running(&self) -> Result<(), LifecycleError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(LifecycleError::Terminated(self.subject.clone()))
        }
    }
}
