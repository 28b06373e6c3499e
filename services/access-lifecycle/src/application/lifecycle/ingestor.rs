//! 信号接收
//!
//! 监听 grant / revoke 两个入口，转换为内部事件后入队。两个入口轮流优先，
//! 持续的 grant 流量不会饿死 revoke，反之亦然。
//!
//! revoke 在入队前检查当前权限表：应用不存在时直接丢弃，不产生事件、
//! 历史或 provisioning 调用。检查看到的是控制器最近一次提交后的表。

use std::sync::Arc;

use metrics::counter;
use permit_common::SubjectId;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use super::queue::{EventSender, QueueClosed, QueuedEvent};
use crate::application::commands::{GrantCommand, RevokeCommand};
use crate::domain::{PermissionLedger, SignalEvent};

enum Inbound {
    Grant(GrantCommand),
    Revoke(RevokeCommand),
}

pub struct SignalIngestor {
    subject: SubjectId,
    grants: mpsc::Receiver<GrantCommand>,
    revokes: mpsc::Receiver<RevokeCommand>,
    ledger: Arc<RwLock<PermissionLedger>>,
    queue: EventSender,
}

impl SignalIngestor {
    pub fn new(
        subject: SubjectId,
        grants: mpsc::Receiver<GrantCommand>,
        revokes: mpsc::Receiver<RevokeCommand>,
        ledger: Arc<RwLock<PermissionLedger>>,
        queue: EventSender,
    ) -> Self {
        Self {
            subject,
            grants,
            revokes,
            ledger,
            queue,
        }
    }

    /// 运行直到两个入口都关闭或事件队列关闭
    pub async fn run(mut self) {
        let mut prefer_grant = true;

        while let Some(inbound) = self.next(prefer_grant).await {
            // 刚处理过哪一类，下一轮就优先另一类
            prefer_grant = matches!(inbound, Inbound::Revoke(_));

            if let Err(QueueClosed) = self.ingest(inbound).await {
                debug!(subject_id = %self.subject, "Event queue closed, stopping signal ingestor");
                return;
            }
        }

        debug!(subject_id = %self.subject, "Command channels closed, signal ingestor stopped");
    }

    async fn next(&mut self, prefer_grant: bool) -> Option<Inbound> {
        if prefer_grant {
            tokio::select! {
                biased;
                Some(cmd) = self.grants.recv() => Some(Inbound::Grant(cmd)),
                Some(cmd) = self.revokes.recv() => Some(Inbound::Revoke(cmd)),
                else => None,
            }
        } else {
            tokio::select! {
                biased;
                Some(cmd) = self.revokes.recv() => Some(Inbound::Revoke(cmd)),
                Some(cmd) = self.grants.recv() => Some(Inbound::Grant(cmd)),
                else => None,
            }
        }
    }

    async fn ingest(&self, inbound: Inbound) -> Result<(), QueueClosed> {
        match inbound {
            Inbound::Grant(cmd) => {
                info!(
                    subject_id = %self.subject,
                    application_name = %cmd.application_name,
                    permission_level = %cmd.permission_level,
                    expiry_seconds = cmd.expiry_seconds,
                    "Grant signal received"
                );
                let event = SignalEvent::grant(cmd.into_permission());
                self.queue.send(QueuedEvent::external(event)).await
            }
            Inbound::Revoke(cmd) => {
                let current = self
                    .ledger
                    .read()
                    .await
                    .permission(&cmd.application_name)
                    .cloned();

                match current {
                    Some(permission) => {
                        info!(
                            subject_id = %self.subject,
                            application_name = %cmd.application_name,
                            "Revoke signal received"
                        );
                        let event = SignalEvent::revoke(permission.expired());
                        self.queue.send(QueuedEvent::external(event)).await
                    }
                    None => {
                        debug!(
                            subject_id = %self.subject,
                            application_name = %cmd.application_name,
                            "Revoke for unknown application dropped"
                        );
                        counter!("permission_revokes_dropped_total").increment(1);
                        Ok(())
                    }
                }
            }
        }
    }
}
