//! 事件队列
//!
//! 有界、保序、单消费者。满时生产者等待，不丢弃事件。

use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::SignalEvent;

/// 定时器标识，每次 arm 递增
pub type TimerId = u64;

/// 队列中的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub event: SignalEvent,
    /// 仅到期事件携带，标识产生它的定时器
    pub timer: Option<TimerId>,
}

impl QueuedEvent {
    pub fn external(event: SignalEvent) -> Self {
        Self { event, timer: None }
    }

    pub fn expiry(event: SignalEvent, timer: TimerId) -> Self {
        Self {
            event,
            timer: Some(timer),
        }
    }
}

#[derive(Debug, Error)]
#[error("event queue closed")]
pub struct QueueClosed;

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<QueuedEvent>,
}

impl EventSender {
    /// 入队，队列满时等待
    pub async fn send(&self, event: QueuedEvent) -> Result<(), QueueClosed> {
        self.tx.send(event).await.map_err(|_| QueueClosed)
    }
}

#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<QueuedEvent>,
}

impl EventReceiver {
    /// 出队，队列为空时等待；所有发送端关闭后返回 None
    pub async fn recv(&mut self) -> Option<QueuedEvent> {
        self.rx.recv().await
    }

    /// 非阻塞出队
    pub fn try_recv(&mut self) -> Option<QueuedEvent> {
        self.rx.try_recv().ok()
    }
}

/// 创建事件队列，容量至少为 1
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}
