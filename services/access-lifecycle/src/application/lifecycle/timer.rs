//! 到期定时器管理
//!
//! 每个应用最多一个在途定时器。定时器自然到期后把 Expire 事件送入队列；
//! 取消只抑制尚未发出的 Expire 事件，不改变权限状态。
//!
//! 定时器一旦开始发送事件，取消就不再生效。控制器收到 Expire 时通过
//! [`ExpiryTimerManager::settle`] 核对定时器 ID，过期或被替换的定时器
//! 发出的事件会被丢弃，因此同一次授予不会产生两次到期。

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::queue::{EventSender, QueuedEvent, TimerId};
use crate::domain::{ApplicationPermission, SignalEvent};

struct ArmedTimer {
    id: TimerId,
    token: CancellationToken,
}

pub struct ExpiryTimerManager {
    timers: HashMap<String, ArmedTimer>,
    next_id: TimerId,
    queue: EventSender,
}

impl ExpiryTimerManager {
    pub fn new(queue: EventSender) -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 0,
            queue,
        }
    }

    /// 为权限挂起到期定时器，已有定时器先取消
    ///
    /// 调用方负责跳过 `after` 为零的永久权限；恢复时剩余时间为零的定时器会立即到期。
    pub fn arm(&mut self, permission: &ApplicationPermission, after: Duration) -> TimerId {
        let app = permission.application_name.clone();
        self.cancel(&app);

        let id = self.next_id;
        self.next_id += 1;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let queue = self.queue.clone();
        let event = SignalEvent::expire(permission.expiry_marker());

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    debug!(application_name = %event.application_name(), timer = id, "Expiry timer cancelled");
                }
                _ = tokio::time::sleep(after) => {
                    debug!(application_name = %event.application_name(), timer = id, "Expiry timer elapsed");
                    if queue.send(QueuedEvent::expiry(event, id)).await.is_err() {
                        debug!(timer = id, "Event queue closed before expiry could be delivered");
                    }
                }
            }
        });

        self.timers.insert(app, ArmedTimer { id, token });
        id
    }

    /// 取消并移除定时器，不存在时什么也不做
    pub fn cancel(&mut self, application_name: &str) -> bool {
        match self.timers.remove(application_name) {
            Some(timer) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    /// 到期事件出队时核对：`id` 仍是该应用当前的定时器才返回 true，并移除记录
    pub fn settle(&mut self, application_name: &str, id: TimerId) -> bool {
        match self.timers.get(application_name) {
            Some(timer) if timer.id == id => {
                self.timers.remove(application_name);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, application_name: &str) -> bool {
        self.timers.contains_key(application_name)
    }

    pub fn live_count(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for ExpiryTimerManager {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.token.cancel();
        }
    }
}
