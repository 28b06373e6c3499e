//! 权限变更历史
//!
//! 只追加，顺序即处理顺序。没有压缩，生命周期内持续增长。

use serde::Serialize;

use super::events::SignalEvent;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct History {
    events: Vec<SignalEvent>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: SignalEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalEvent> {
        self.events.iter()
    }

    pub fn snapshot(&self) -> Vec<SignalEvent> {
        self.events.clone()
    }
}
