//! 内存事件日志

use std::collections::HashMap;

use async_trait::async_trait;
use permit_common::SubjectId;
use permit_errors::AppResult;
use tokio::sync::RwLock;

use crate::domain::{EventJournal, JournalEntry};

#[derive(Debug, Default)]
pub struct InMemoryEventJournal {
    entries: RwLock<HashMap<SubjectId, Vec<JournalEntry>>>,
}

impl InMemoryEventJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventJournal for InMemoryEventJournal {
    async fn append(&self, subject: &SubjectId, entry: &JournalEntry) -> AppResult<()> {
        self.entries
            .write()
            .await
            .entry(subject.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn load(&self, subject: &SubjectId) -> AppResult<Vec<JournalEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(subject)
            .cloned()
            .unwrap_or_default())
    }

    async fn subjects(&self) -> AppResult<Vec<SubjectId>> {
        let mut subjects: Vec<_> = self.entries.read().await.keys().cloned().collect();
        subjects.sort();
        Ok(subjects)
    }
}
