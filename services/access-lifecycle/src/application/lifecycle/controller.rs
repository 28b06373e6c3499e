//! 生命周期控制器
//!
//! 按入队顺序逐个处理事件，一次只处理一个。每个事件的处理顺序是：
//! 取消/确认定时器 → 调用 provisioning → 写日志 → 更新账本 → 必要时挂起新定时器。
//!
//! provisioning 失败或超时、日志写入失败都会使 `run` 返回错误，生命周期随之终止；
//! 失败的事件不会进入权限表和历史。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use permit_common::SubjectId;
use permit_errors::AppResult;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::handle::LifecycleDeps;
use super::queue::{EventReceiver, QueuedEvent, TimerId};
use super::timer::ExpiryTimerManager;
use crate::domain::{
    Clock, EventJournal, JournalEntry, PendingExpiry, PermissionLedger, PermissionState,
    ProvisioningService, SignalEvent, SignalKind,
};
use crate::error::LifecycleError;

pub struct LifecycleController {
    subject: SubjectId,
    ledger: Arc<RwLock<PermissionLedger>>,
    queue: EventReceiver,
    timers: ExpiryTimerManager,
    provisioning: Arc<dyn ProvisioningService>,
    journal: Arc<dyn EventJournal>,
    clock: Arc<dyn Clock>,
    provisioning_timeout: Duration,
    next_sequence: u64,
}

impl LifecycleController {
    /// `next_sequence` 为下一条日志的序号，恢复时等于已重放的条目数
    pub fn new(
        subject: SubjectId,
        ledger: Arc<RwLock<PermissionLedger>>,
        queue: EventReceiver,
        timers: ExpiryTimerManager,
        deps: &LifecycleDeps,
        next_sequence: u64,
    ) -> Self {
        Self {
            subject,
            ledger,
            queue,
            timers,
            provisioning: deps.provisioning.clone(),
            journal: deps.journal.clone(),
            clock: deps.clock.clone(),
            provisioning_timeout: deps.settings.provisioning_timeout,
            next_sequence,
        }
    }

    /// 恢复时重新挂起仍在生效的到期定时器，已过期的立即触发
    pub fn restore_timers(&mut self, pending: Vec<PendingExpiry>) {
        let now = self.clock.now();
        for expiry in pending {
            let remaining = expiry.remaining(now);
            info!(
                subject_id = %self.subject,
                application_name = %expiry.permission.application_name,
                remaining_secs = remaining.as_secs(),
                "Re-arming expiry timer"
            );
            self.timers.arm(&expiry.permission, remaining);
        }
    }

    pub async fn run(mut self) -> AppResult<()> {
        info!(subject_id = %self.subject, "Lifecycle controller started");

        while let Some(queued) = self.queue.recv().await {
            self.process(queued).await?;
        }

        info!(subject_id = %self.subject, "Event queue closed, lifecycle controller stopped");
        Ok(())
    }

    pub async fn process(&mut self, queued: QueuedEvent) -> AppResult<()> {
        let QueuedEvent { event, timer } = queued;
        match event.kind {
            SignalKind::Grant => self.on_grant(event).await,
            SignalKind::Revoke => self.on_revoke(event).await,
            SignalKind::Expire => self.on_expire(event, timer).await,
        }
    }

    async fn on_grant(&mut self, event: SignalEvent) -> AppResult<()> {
        let permission = event.permission.clone();
        let app = permission.application_name.clone();

        // 重新授予会替换旧的到期定时器
        self.timers.cancel(&app);

        self.provision(
            "grant",
            &app,
            self.provisioning.grant(
                &self.subject,
                &app,
                &permission.permission_level,
                permission.expiry_seconds(),
            ),
        )
        .await?;
        self.commit(event).await?;

        if permission.has_expiry() {
            self.timers.arm(&permission, permission.expiry);
        }

        info!(
            subject_id = %self.subject,
            application_name = %app,
            permission_level = %permission.permission_level,
            expiry_seconds = permission.expiry_seconds(),
            "Permission granted"
        );
        Ok(())
    }

    async fn on_revoke(&mut self, event: SignalEvent) -> AppResult<()> {
        let app = event.application_name().to_string();
        self.timers.cancel(&app);

        self.provision(
            "revoke",
            &app,
            self.provisioning.revoke(&self.subject, &app),
        )
        .await?;
        self.commit(event).await?;

        info!(subject_id = %self.subject, application_name = %app, "Permission revoked");
        Ok(())
    }

    async fn on_expire(&mut self, event: SignalEvent, timer: Option<TimerId>) -> AppResult<()> {
        let app = event.application_name().to_string();

        let live = timer.is_some_and(|id| self.timers.settle(&app, id));
        if !live || self.ledger.read().await.state_of(&app) != PermissionState::Active {
            debug!(
                subject_id = %self.subject,
                application_name = %app,
                timer_id = ?timer,
                "Stale expiry discarded"
            );
            counter!("permission_stale_expiries_total").increment(1);
            return Ok(());
        }

        self.provision(
            "revoke",
            &app,
            self.provisioning.revoke(&self.subject, &app),
        )
        .await?;
        self.commit(event).await?;

        info!(subject_id = %self.subject, application_name = %app, "Permission expired");
        Ok(())
    }

    async fn provision<F>(
        &self,
        operation: &'static str,
        application_name: &str,
        call: F,
    ) -> AppResult<()>
    where
        F: Future<Output = AppResult<()>>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.provisioning_timeout, call).await;
        histogram!("provisioning_call_duration_ms", "operation" => operation)
            .record(elapsed_ms(started));

        let outcome = match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(LifecycleError::ProvisioningFailed {
                operation,
                application_name: application_name.to_string(),
                source,
            }),
            Err(_) => Err(LifecycleError::ProvisioningTimedOut {
                operation,
                application_name: application_name.to_string(),
                timeout: self.provisioning_timeout,
            }),
        };

        let label = if outcome.is_ok() { "success" } else { "failure" };
        counter!("provisioning_calls_total", "operation" => operation, "outcome" => label)
            .increment(1);

        outcome.map_err(|e| {
            error!(subject_id = %self.subject, error = %e, "Provisioning call failed");
            e.into()
        })
    }

    /// 先写日志，再对查询可见
    async fn commit(&mut self, event: SignalEvent) -> AppResult<()> {
        let entry = JournalEntry::new(self.next_sequence, self.clock.now(), event);
        self.journal.append(&self.subject, &entry).await?;
        self.next_sequence += 1;

        let kind = entry.event.kind;
        self.ledger.write().await.apply(entry.event);
        counter!("permission_transitions_total", "kind" => kind.as_str()).increment(1);
        Ok(())
    }
}

/// 经过 tokio 时钟计算，暂停时钟下与定时器一致
fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::handle::LifecycleSettings;
    use crate::application::lifecycle::queue::event_queue;
    use crate::domain::{ApplicationPermission, PermissionStatus, SystemClock};
    use crate::infrastructure::journal::InMemoryEventJournal;
    use async_trait::async_trait;
    use permit_errors::AppError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvisioning {
        calls: Mutex<Vec<String>>,
        fail_grants: bool,
        delay: Option<Duration>,
    }

    impl RecordingProvisioning {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
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
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(format!(
                "grant:{application_name}:{permission_level}:{expiry_seconds}"
            ));
            if self.fail_grants {
                return Err(AppError::external_service("provisioning unavailable"));
            }
            Ok(())
        }

        async fn revoke(&self, _subject: &SubjectId, application_name: &str) -> AppResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("revoke:{application_name}"));
            Ok(())
        }
    }

    struct Fixture {
        controller: LifecycleController,
        ledger: Arc<RwLock<PermissionLedger>>,
        journal: Arc<InMemoryEventJournal>,
    }

    fn fixture(provisioning: Arc<RecordingProvisioning>) -> Fixture {
        let journal = Arc::new(InMemoryEventJournal::new());
        let deps = LifecycleDeps {
            provisioning,
            journal: journal.clone(),
            clock: Arc::new(SystemClock),
            settings: LifecycleSettings::default(),
            active: Arc::default(),
        };
        let ledger = Arc::new(RwLock::new(PermissionLedger::new()));
        let (tx, rx) = event_queue(8);
        let controller = LifecycleController::new(
            SubjectId::from("employee-000001"),
            ledger.clone(),
            rx,
            ExpiryTimerManager::new(tx),
            &deps,
            0,
        );
        Fixture {
            controller,
            ledger,
            journal,
        }
    }

    fn grant(app: &str, level: &str, secs: u64) -> QueuedEvent {
        QueuedEvent::external(SignalEvent::grant(ApplicationPermission::active(
            app,
            level,
            Duration::from_secs(secs),
        )))
    }

    #[tokio::test]
    async fn test_grant_without_expiry_arms_no_timer() {
        let provisioning = Arc::new(RecordingProvisioning::default());
        let mut f = fixture(provisioning.clone());

        f.controller.process(grant("Office365", "User", 0)).await.unwrap();

        assert_eq!(provisioning.calls(), vec!["grant:Office365:User:0"]);
        assert_eq!(f.controller.timers.live_count(), 0);
        let ledger = f.ledger.read().await;
        assert_eq!(ledger.state_of("Office365"), PermissionState::Active);
        assert_eq!(ledger.history_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_regrant_keeps_single_timer() {
        let provisioning = Arc::new(RecordingProvisioning::default());
        let mut f = fixture(provisioning.clone());

        f.controller.process(grant("Jira", "Viewer", 5)).await.unwrap();
        f.controller.process(grant("Jira", "Editor", 20)).await.unwrap();

        assert_eq!(f.controller.timers.live_count(), 1);
        let ledger = f.ledger.read().await;
        assert_eq!(ledger.permission("Jira").unwrap().permission_level, "Editor");
        assert_eq!(ledger.history_len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_revokes_and_marks_expired() {
        let provisioning = Arc::new(RecordingProvisioning::default());
        let mut f = fixture(provisioning.clone());

        f.controller.process(grant("Slack", "Member", 1)).await.unwrap();
        let expired = f.controller.queue.recv().await.unwrap();
        f.controller.process(expired).await.unwrap();

        assert_eq!(
            provisioning.calls(),
            vec!["grant:Slack:Member:1", "revoke:Slack"]
        );
        let ledger = f.ledger.read().await;
        assert_eq!(
            ledger.permission("Slack").unwrap().status,
            PermissionStatus::Expired
        );
        let kinds: Vec<_> = ledger.history().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SignalKind::Grant, SignalKind::Expire]);
        assert_eq!(f.controller.timers.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_expiry_is_discarded() {
        let provisioning = Arc::new(RecordingProvisioning::default());
        let mut f = fixture(provisioning.clone());

        f.controller.process(grant("Jira", "Viewer", 1)).await.unwrap();
        let stale = f.controller.queue.recv().await.unwrap();
        f.controller.process(grant("Jira", "Editor", 20)).await.unwrap();
        f.controller.process(stale).await.unwrap();

        assert_eq!(
            provisioning.calls(),
            vec!["grant:Jira:Viewer:1", "grant:Jira:Editor:20"]
        );
        let ledger = f.ledger.read().await;
        assert_eq!(ledger.state_of("Jira"), PermissionState::Active);
        assert_eq!(ledger.history_len(), 2);
        assert!(f.controller.timers.is_armed("Jira"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_cancels_timer() {
        let provisioning = Arc::new(RecordingProvisioning::default());
        let mut f = fixture(provisioning.clone());

        f.controller.process(grant("Slack", "Member", 10)).await.unwrap();
        let revoke = SignalEvent::revoke(
            f.ledger.read().await.permission("Slack").unwrap().expired(),
        );
        f.controller
            .process(QueuedEvent::external(revoke))
            .await
            .unwrap();

        assert_eq!(f.controller.timers.live_count(), 0);
        assert_eq!(f.ledger.read().await.state_of("Slack"), PermissionState::Absent);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(f.controller.queue.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_failed_grant_leaves_state_untouched() {
        let provisioning = Arc::new(RecordingProvisioning {
            fail_grants: true,
            ..Default::default()
        });
        let mut f = fixture(provisioning.clone());

        let err = f
            .controller
            .process(grant("Office365", "User", 30))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(f.controller.timers.live_count(), 0);
        let ledger = f.ledger.read().await;
        assert_eq!(ledger.state_of("Office365"), PermissionState::Absent);
        assert_eq!(ledger.history_len(), 0);
        let subject = SubjectId::from("employee-000001");
        assert!(f.journal.load(&subject).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provisioning_times_out() {
        let provisioning = Arc::new(RecordingProvisioning {
            delay: Some(Duration::from_secs(600)),
            ..Default::default()
        });
        let mut f = fixture(provisioning);

        let err = f
            .controller
            .process(grant("Office365", "User", 0))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout(_)));
        assert_eq!(f.ledger.read().await.history_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_duration_follows_tokio_clock() {
        let started = Instant::now();
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(elapsed_ms(started), 1500.0);
    }

    #[tokio::test]
    async fn test_commit_journals_in_sequence() {
        let provisioning = Arc::new(RecordingProvisioning::default());
        let mut f = fixture(provisioning);

        f.controller.process(grant("a", "User", 0)).await.unwrap();
        f.controller.process(grant("b", "User", 0)).await.unwrap();

        let subject = SubjectId::from("employee-000001");
        let entries = f.journal.load(&subject).await.unwrap();
        let sequences: Vec<_> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
        assert_eq!(entries[1].event.application_name(), "b");
    }
}
